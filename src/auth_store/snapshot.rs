//! Durable snapshot of the auth state
//!
//! Only the routing flags and a minimal identity survive a restart. Session
//! tokens and the budget never reach the backing storage.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth_store::AuthState;
use crate::error::Result;
use crate::storage::KeyValueStorage;

const SNAPSHOT_VERSION: u32 = 0;

/// The identity fields kept in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySummary {
    pub id: String,
    pub email: Option<String>,
}

/// Reduced projection of [`AuthState`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub is_logged_in: bool,
    pub has_completed_profile: bool,
    pub user: Option<IdentitySummary>,
}

impl Snapshot {
    /// Project the persisted subset out of `state`.
    ///
    /// A restored snapshot that is still pending reconciliation is projected
    /// unchanged, so persisting before the session check never loses it.
    pub fn project(state: &AuthState) -> Self {
        if let Some(restored) = state.restored() {
            return restored.clone();
        }
        Self {
            is_logged_in: state.is_logged_in(),
            has_completed_profile: state.has_completed_profile(),
            user: state.identity().map(|identity| IdentitySummary {
                id: identity.id.clone(),
                email: identity.email.clone(),
            }),
        }
    }

    pub fn is_logged_out(&self) -> bool {
        !self.is_logged_in && !self.has_completed_profile && self.user.is_none()
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    state: Snapshot,
    #[serde(default)]
    version: u32,
}

/// Reads and writes snapshots under one storage key
#[derive(Clone)]
pub struct SnapshotStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl SnapshotStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: &str) -> Self {
        Self {
            storage,
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The stored text, exactly as written
    pub async fn load_raw(&self) -> Result<Option<String>> {
        self.storage.get_item(&self.key).await
    }

    /// Parse the stored snapshot
    pub async fn load(&self) -> Result<Option<Snapshot>> {
        match self.load_raw().await? {
            Some(raw) => {
                let envelope: Envelope = serde_json::from_str(&raw)?;
                if envelope.version != SNAPSHOT_VERSION {
                    log::warn!(
                        "snapshot version {} differs from {}",
                        envelope.version,
                        SNAPSHOT_VERSION
                    );
                }
                Ok(Some(envelope.state))
            }
            None => Ok(None),
        }
    }

    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let raw = serde_json::to_string(&Envelope {
            state: snapshot.clone(),
            version: SNAPSHOT_VERSION,
        })?;
        self.storage.set_item(&self.key, &raw).await
    }

    pub async fn remove(&self) -> Result<()> {
        self.storage.remove_item(&self.key).await
    }
}
