//! Error handling for the financeU client

use std::fmt;
use thiserror::Error;

/// PostgREST code returned by `.single()` when zero rows match
pub(crate) const PGRST_NO_ROWS: &str = "PGRST116";

/// Unified error type for the financeU client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors reported by the auth service
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Errors reported by the table API
    #[error("Database error: {message} (code: {code:?}, status: {status})")]
    Database {
        code: Option<String>,
        message: String,
        status: u16,
    },

    /// The requested row does not exist
    #[error("No matching row")]
    NotFound,

    /// The operation needs an authenticated identity
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Input rejected before any remote call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Durable key-value storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Local file I/O errors from storage backends
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Completion service errors
    #[error("Completion error: {0}")]
    Completion(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new database error without a PostgREST code
    pub fn database<T: fmt::Display>(status: u16, msg: T) -> Self {
        Error::Database {
            code: None,
            message: msg.to_string(),
            status,
        }
    }

    /// Create a new input validation error
    pub fn invalid_input<T: fmt::Display>(msg: T) -> Self {
        Error::InvalidInput(msg.to_string())
    }

    /// Create a new storage error
    pub fn storage<T: fmt::Display>(msg: T) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Create a new completion error
    pub fn completion<T: fmt::Display>(msg: T) -> Self {
        Error::Completion(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// True for the expected "no such row" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinct_from_database_errors() {
        assert!(Error::NotFound.is_not_found());
        assert!(!Error::database(500, "boom").is_not_found());
    }

    #[test]
    fn database_error_mentions_code() {
        let err = Error::Database {
            code: Some("23505".to_string()),
            message: "duplicate key".to_string(),
            status: 409,
        };
        let text = err.to_string();
        assert!(text.contains("duplicate key"));
        assert!(text.contains("23505"));
    }
}
