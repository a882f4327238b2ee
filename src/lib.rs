//! financeU client core
//!
//! Session, profile and budget state for the financeU personal-finance app,
//! backed by a hosted auth service, a PostgREST table API and a text
//! completion API.
//!
//! The state manager, [`auth_store::AuthStore`], is written against the
//! [`auth::SessionService`] and [`db::ProfileStore`] traits, so it can run on
//! the HTTP clients wired up by [`FinanceU`] or on test fakes.

pub mod auth;
pub mod auth_store;
pub mod budget;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod ledger;
pub mod postgrest;
pub mod storage;

use reqwest::Client;
use std::sync::Arc;

use crate::auth::Auth;
use crate::auth_store::{AuthStore, SnapshotStore};
use crate::completion::{Assistant, GeminiClient};
use crate::config::{ClientOptions, FinanceUConfig};
use crate::db::RemoteStore;
use crate::error::Result;
use crate::ledger::ExpenseLedger;
use crate::postgrest::PostgrestClient;
use crate::storage::KeyValueStorage;

/// The HTTP clients of one project, wired together
pub struct FinanceU {
    config: FinanceUConfig,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Auth client for sign-in and session management
    pub auth: Arc<Auth>,
    /// Profile and expense tables
    pub store: Arc<RemoteStore>,
    /// Client options
    pub options: ClientOptions,
    storage: Option<Arc<dyn KeyValueStorage>>,
}

impl FinanceU {
    /// Create a client with default options
    ///
    /// # Example
    ///
    /// ```
    /// use financeu::{FinanceU, config::FinanceUConfig};
    ///
    /// let config = FinanceUConfig::new("https://your-project.supabase.co", "your-anon-key").unwrap();
    /// let app = FinanceU::new(config, None);
    /// ```
    pub fn new(config: FinanceUConfig, storage: Option<Arc<dyn KeyValueStorage>>) -> Self {
        Self::new_with_options(config, storage, ClientOptions::default())
    }

    /// Create a client with custom options.
    ///
    /// `storage` backs both the auth client's own session (when
    /// `persist_session` is set) and the durable snapshot.
    pub fn new_with_options(
        config: FinanceUConfig,
        storage: Option<Arc<dyn KeyValueStorage>>,
        options: ClientOptions,
    ) -> Self {
        let http_client = Client::new();
        let base_url = config.base_url();

        let mut auth = Auth::new(&base_url, &config.anon_key, http_client.clone(), &options);
        if let Some(storage) = storage.as_ref().filter(|_| options.persist_session) {
            auth = auth.with_storage(storage.clone());
        }
        let auth = Arc::new(auth);

        let store = Arc::new(RemoteStore::new(
            &base_url,
            &config.anon_key,
            http_client.clone(),
            options.clone(),
            auth.clone(),
        ));

        Self {
            config,
            http_client,
            auth,
            store,
            options,
            storage,
        }
    }

    /// Create a client from `SUPABASE_URL`, `SUPABASE_ANON_KEY` and `GEMINI_API_KEY`
    pub fn from_env(storage: Option<Arc<dyn KeyValueStorage>>) -> Result<Self> {
        Ok(Self::new(FinanceUConfig::from_env()?, storage))
    }

    /// A table client using the active session's token
    pub fn from(&self, table: &str) -> PostgrestClient {
        let client = PostgrestClient::new(
            &self.config.base_url(),
            &self.config.anon_key,
            table,
            self.http_client.clone(),
            &self.options,
        );
        match self.auth.cached_session() {
            Some(session) => client.with_auth(&session.access_token),
            None => client,
        }
    }

    /// Build the shared auth state manager
    pub fn auth_store(&self) -> AuthStore {
        let mut builder = AuthStore::builder(self.auth.clone(), self.store.clone())
            .clear_snapshot_on_logout(self.options.clear_snapshot_on_logout);
        if let Some(storage) = &self.storage {
            builder = builder.snapshots(SnapshotStore::new(
                storage.clone(),
                &self.options.snapshot_key,
            ));
        }
        builder.build()
    }

    /// Expense ledger for the identity held by `auth_store`
    pub fn ledger(&self, auth_store: AuthStore) -> ExpenseLedger {
        ExpenseLedger::new(self.store.clone(), auth_store)
    }

    /// Finance assistant using the configured completion API key
    pub fn assistant(&self) -> Assistant {
        Assistant::new(Arc::new(GeminiClient::new(
            self.config.gemini_api_key.as_deref(),
            self.http_client.clone(),
            self.options.clone(),
        )))
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{Identity, Session, SessionService};
    pub use crate::auth_store::{AuthPhase, AuthState, AuthStore, Route, Snapshot};
    pub use crate::config::{ClientOptions, FinanceUConfig};
    pub use crate::db::{Profile, ProfileInput};
    pub use crate::error::{Error, Result};
    pub use crate::FinanceU;
}
