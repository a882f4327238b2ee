//! Authentication against the hosted auth service

mod session;
mod types;

use async_trait::async_trait;
use reqwest::Client;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, Service};
use crate::storage::KeyValueStorage;

pub use session::*;
pub use types::*;

/// The session operations the app core depends on
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Exchange email and password for a session
    async fn sign_in(&self, credentials: &SignInCredentials) -> Result<Session>;

    /// The currently valid session, `None` when nobody is signed in
    async fn current_session(&self) -> Result<Option<Session>>;

    /// Make `session` the one used for subsequent authenticated calls
    async fn set_active_session(&self, session: Session) -> Result<()>;

    /// Invalidate the active session
    async fn sign_out(&self) -> Result<()>;
}

/// Client for the hosted auth service
pub struct Auth {
    /// The base URL for the project
    url: String,

    /// The anonymous API key for the project
    key: String,

    /// HTTP client used for requests
    client: Client,

    /// The current session
    session: Arc<RwLock<Option<Session>>>,

    /// Where the session survives restarts, when persistence is on
    storage: Option<Arc<dyn KeyValueStorage>>,

    storage_key: String,

    timeout: Option<Duration>,
}

impl Auth {
    /// Create a new Auth client
    pub fn new(url: &str, key: &str, client: Client, options: &ClientOptions) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
            session: Arc::new(RwLock::new(None)),
            storage: None,
            storage_key: options.auth_session_key.clone(),
            timeout: options.request_timeout,
        }
    }

    /// Persist the session in `storage` so it survives restarts
    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    /// The session held in memory, without refreshing or loading it
    pub fn cached_session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|guard| (*guard).clone())
    }

    async fn store_session(&self, session: Option<Session>) -> Result<()> {
        if let Some(storage) = &self.storage {
            match &session {
                Some(session) => {
                    let raw = serde_json::to_string(session)?;
                    storage.set_item(&self.storage_key, &raw).await?;
                }
                None => storage.remove_item(&self.storage_key).await?,
            }
        }
        let mut guard = self
            .session
            .write()
            .map_err(|_| Error::auth("session lock poisoned"))?;
        *guard = session;
        Ok(())
    }

    async fn load_stored_session(&self) -> Result<Option<Session>> {
        let Some(storage) = &self.storage else {
            return Ok(None);
        };
        match storage.get_item(&self.storage_key).await? {
            Some(raw) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => Ok(Some(session.with_expiry())),
                Err(e) => {
                    log::warn!("discarding unreadable stored session: {}", e);
                    storage.remove_item(&self.storage_key).await?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Exchange a refresh token for a new session
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let url = self.auth_url("/token?grant_type=refresh_token");
        let payload = serde_json::json!({ "refresh_token": refresh_token });

        let session = Fetch::post(&self.client, &url, Service::Auth)
            .header("apikey", &self.key)
            .timeout(self.timeout)
            .json(&payload)?
            .execute::<Session>()
            .await?
            .with_expiry();

        self.store_session(Some(session.clone())).await?;
        Ok(session)
    }

    /// Fetch the user behind the active session
    pub async fn get_user(&self) -> Result<Identity> {
        let session = self
            .current_session()
            .await?
            .ok_or_else(|| Error::auth("Not logged in"))?;

        Fetch::get(&self.client, &self.auth_url("/user"), Service::Auth)
            .header("apikey", &self.key)
            .bearer_auth(&session.access_token)
            .timeout(self.timeout)
            .execute::<Identity>()
            .await
    }
}

#[async_trait]
impl SessionService for Auth {
    async fn sign_in(&self, credentials: &SignInCredentials) -> Result<Session> {
        let url = self.auth_url("/token?grant_type=password");

        let session = Fetch::post(&self.client, &url, Service::Auth)
            .header("apikey", &self.key)
            .timeout(self.timeout)
            .json(credentials)?
            .execute::<Session>()
            .await?
            .with_expiry();

        log::info!("signed in as {}", session.user.id);
        self.store_session(Some(session.clone())).await?;
        Ok(session)
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        let session = match self.cached_session() {
            Some(session) => Some(session),
            None => self.load_stored_session().await?,
        };

        match session {
            Some(session) if session.is_expired() => {
                log::debug!("session for {} expired, refreshing", session.user.id);
                match self.refresh_session(&session.refresh_token).await {
                    Ok(fresh) => Ok(Some(fresh)),
                    Err(e) => {
                        self.store_session(None).await?;
                        Err(e)
                    }
                }
            }
            Some(session) => {
                if self.cached_session().is_none() {
                    self.store_session(Some(session.clone())).await?;
                }
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn set_active_session(&self, session: Session) -> Result<()> {
        self.store_session(Some(session.with_expiry())).await
    }

    async fn sign_out(&self) -> Result<()> {
        let token = self.cached_session().map(|s| s.access_token);

        // The local session is dropped even if the remote call fails.
        let remote = match token {
            Some(token) => {
                Fetch::post(&self.client, &self.auth_url("/logout"), Service::Auth)
                    .header("apikey", &self.key)
                    .bearer_auth(&token)
                    .timeout(self.timeout)
                    .execute_empty()
                    .await
            }
            None => Ok(()),
        };

        self.store_session(None).await?;
        remote
    }
}
