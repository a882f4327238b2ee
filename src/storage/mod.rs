//! Durable key-value storage used for session and snapshot persistence
//!
//! Values are plain strings, mirroring the secure-storage APIs found on mobile
//! platforms. Backend errors are returned to the caller, never swallowed.

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::{Error, Result};

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// String key-value storage backend
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Read an item, `None` when the key was never written or was removed
    async fn get_item(&self, name: &str) -> Result<Option<String>>;

    /// Write an item, replacing any previous value
    async fn set_item(&self, name: &str, value: &str) -> Result<()>;

    /// Delete an item; deleting a missing key is not an error
    async fn remove_item(&self, name: &str) -> Result<()>;
}

/// Keys end up as file names on some backends, so keep them to a safe alphabet.
pub(crate) fn validate_key(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(Error::storage(format!("invalid storage key: {:?}", name)))
    }
}
