use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{validate_key, KeyValueStorage};
use crate::error::{Error, Result};

/// In-process storage; contents are lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::storage("memory storage lock poisoned")
}

#[async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get_item(&self, name: &str) -> Result<Option<String>> {
        validate_key(name)?;
        let items = self.items.read().map_err(poisoned)?;
        Ok(items.get(name).cloned())
    }

    async fn set_item(&self, name: &str, value: &str) -> Result<()> {
        validate_key(name)?;
        let mut items = self.items.write().map_err(poisoned)?;
        items.insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, name: &str) -> Result<()> {
        validate_key(name)?;
        let mut items = self.items.write().map_err(poisoned)?;
        items.remove(name);
        Ok(())
    }
}
