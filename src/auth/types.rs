//! Types for authentication

use serde::{Deserialize, Serialize};

/// Authenticated user record issued by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// The user ID
    pub id: String,

    /// The user's email address
    #[serde(default)]
    pub email: Option<String>,

    /// The user's phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// The user's role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// The creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// The user metadata
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl Identity {
    /// Identity with only the fields every user has
    pub fn new(id: &str, email: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            email: email.map(str::to_string),
            phone: None,
            role: None,
            created_at: None,
            user_metadata: serde_json::Value::Null,
        }
    }

    /// Email or empty string
    pub fn email_or_default(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }
}

/// Email and password credentials
#[derive(Debug, Clone, Serialize)]
pub struct SignInCredentials {
    pub email: String,
    pub password: String,
}

impl SignInCredentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }

    /// Both fields must be filled in
    pub fn is_complete(&self) -> bool {
        !self.email.is_empty() && !self.password.is_empty()
    }
}
