//! Session credentials

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::error::Result;

/// Seconds before expiry at which a session is treated as expired
const EXPIRY_MARGIN_SECS: i64 = 10;

/// Session data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The access token
    pub access_token: String,

    /// The refresh token
    pub refresh_token: String,

    /// The token type
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// The lifetime in seconds at issue time
    #[serde(default)]
    pub expires_in: i64,

    /// The expiry timestamp
    #[serde(default)]
    pub expires_at: Option<i64>,

    /// The user this session belongs to
    pub user: Identity,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Claims read from an access token
#[derive(Debug, Clone, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Session {
    /// Create a new session that expires `expires_in` seconds from now
    pub fn new(access_token: &str, refresh_token: &str, expires_in: i64, user: Identity) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            token_type: default_token_type(),
            expires_in,
            expires_at: Some(now_secs() + expires_in),
            user,
        }
    }

    /// Decode the access token claims without checking the signature.
    ///
    /// The signing secret lives on the server; this is only used to read `exp`.
    pub fn claims(&self) -> Result<AccessClaims> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<AccessClaims>(
            &self.access_token,
            &DecodingKey::from_secret(&[]),
            &validation,
        )?;
        Ok(data.claims)
    }

    /// Fill in `expires_at` when the service omitted it
    pub(crate) fn with_expiry(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = match self.claims() {
                Ok(claims) => Some(claims.exp),
                Err(_) if self.expires_in > 0 => Some(now_secs() + self.expires_in),
                Err(_) => None,
            };
        }
        self
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => now_secs() + EXPIRY_MARGIN_SECS >= expires_at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        exp: i64,
        email: &'a str,
    }

    fn token(exp: i64) -> String {
        encode(
            &Header::default(),
            &TestClaims {
                sub: "u1",
                exp,
                email: "a@b.com",
            },
            &EncodingKey::from_secret(b"server-secret"),
        )
        .unwrap()
    }

    #[test]
    fn fresh_session_is_not_expired() {
        let session = Session::new("a", "r", 3600, Identity::new("u1", None));
        assert!(!session.is_expired());
    }

    #[test]
    fn past_expiry_is_expired() {
        let mut session = Session::new("a", "r", 3600, Identity::new("u1", None));
        session.expires_at = Some(now_secs() - 1);
        assert!(session.is_expired());
    }

    #[test]
    fn expiry_is_read_from_token() {
        let exp = now_secs() + 120;
        let mut session = Session::new(&token(exp), "r", 0, Identity::new("u1", None));
        session.expires_at = None;

        let claims = session.claims().unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email.as_deref(), Some("a@b.com"));
        assert_eq!(session.with_expiry().expires_at, Some(exp));
    }

    #[test]
    fn opaque_token_falls_back_to_expires_in() {
        let mut session = Session::new("opaque", "r", 60, Identity::new("u1", None));
        session.expires_at = None;
        let session = session.with_expiry();
        assert!(session.expires_at.is_some());
        assert!(!session.is_expired());
    }
}
