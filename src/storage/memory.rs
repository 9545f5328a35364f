use std::collections::HashMap;
use std::sync::RwLock;

use super::{KeyValueStore, UpdateFn};
use crate::utils::error::StoreError;

/// In-process store. Used by tests and when `SETTINGS_STORE_PATH` is blank
/// (nothing survives a restart).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn update(&self, key: &str, apply: &mut UpdateFn<'_>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        if let Some(value) = apply(entries.get(key).cloned())? {
            entries.insert(key.to_string(), value);
        }
        Ok(())
    }
}
