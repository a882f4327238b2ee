//! Configuration options for the financeU client

use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Connection settings for the hosted backend and the completion API
#[derive(Debug, Clone)]
pub struct FinanceUConfig {
    /// Base URL of the Supabase project
    pub url: Url,
    /// Anonymous API key of the Supabase project
    pub anon_key: String,
    /// API key for the completion service, if the assistant is enabled
    pub gemini_api_key: Option<String>,
}

impl FinanceUConfig {
    /// Creates a new configuration, validating the URL and key.
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        if anon_key.is_empty() {
            return Err(Error::config("anon_key cannot be empty"));
        }
        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
            gemini_api_key: None,
        })
    }

    /// Set the completion service API key
    pub fn with_gemini_api_key(mut self, key: &str) -> Self {
        self.gemini_api_key = Some(key.to_string()).filter(|k| !k.is_empty());
        self
    }

    /// Reads `SUPABASE_URL`, `SUPABASE_ANON_KEY` and the optional `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| Error::config("SUPABASE_URL environment variable not found"))?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| Error::config("SUPABASE_ANON_KEY environment variable not found"))?;
        let config = Self::new(&url, &anon_key)?;
        Ok(match std::env::var("GEMINI_API_KEY") {
            Ok(key) => config.with_gemini_api_key(&key),
            Err(_) => config,
        })
    }

    /// Base URL without a trailing slash
    pub(crate) fn base_url(&self) -> String {
        self.url.as_str().trim_end_matches('/').to_string()
    }
}

/// Configuration options for the financeU client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The database schema
    pub db_schema: String,

    /// Table holding one budgeting profile per user
    pub profile_table: String,

    /// Table holding expenses
    pub expense_table: String,

    /// Whether the auth client persists its own session
    pub persist_session: bool,

    /// Storage key for the auth client's own session
    pub auth_session_key: String,

    /// Storage key for the durable auth snapshot
    pub snapshot_key: String,

    /// Remove the durable snapshot when logging out
    pub clear_snapshot_on_logout: bool,

    /// Completion model name
    pub completion_model: String,

    /// Completion API base URL
    pub completion_base_url: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            db_schema: "public".to_string(),
            profile_table: "Profiles".to_string(),
            expense_table: "budget".to_string(),
            persist_session: true,
            auth_session_key: "sb-auth-token".to_string(),
            snapshot_key: "auth-storage".to_string(),
            clear_snapshot_on_logout: false,
            completion_model: "gemini-1.5-flash".to_string(),
            completion_base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }

    /// Set the profile table name
    pub fn with_profile_table(mut self, value: &str) -> Self {
        self.profile_table = value.to_string();
        self
    }

    /// Set the expense table name
    pub fn with_expense_table(mut self, value: &str) -> Self {
        self.expense_table = value.to_string();
        self
    }

    /// Set whether the auth client persists its session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the storage key for the auth client's session
    pub fn with_auth_session_key(mut self, value: &str) -> Self {
        self.auth_session_key = value.to_string();
        self
    }

    /// Set the storage key for the durable snapshot
    pub fn with_snapshot_key(mut self, value: &str) -> Self {
        self.snapshot_key = value.to_string();
        self
    }

    /// Set whether logging out removes the durable snapshot
    pub fn with_clear_snapshot_on_logout(mut self, value: bool) -> Self {
        self.clear_snapshot_on_logout = value;
        self
    }

    /// Set the completion model
    pub fn with_completion_model(mut self, value: &str) -> Self {
        self.completion_model = value.to_string();
        self
    }

    /// Set the completion API base URL
    pub fn with_completion_base_url(mut self, value: &str) -> Self {
        self.completion_base_url = value.trim_end_matches('/').to_string();
        self
    }
}
