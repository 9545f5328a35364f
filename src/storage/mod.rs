// ==================== KEY-VALUE STORAGE ====================
// Substitui o local storage do navegador por um store injetado.
// Blobs são strings JSON indexadas por chave. `update` é o único
// read-modify-write atômico; `set` puro é last-writer-wins.

pub mod file;
pub mod memory;
pub mod settings_store;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use settings_store::SettingsStore;

use serde::{de::DeserializeOwned, Serialize};

use crate::utils::error::StoreError;

/// Callback for [`KeyValueStore::update`]: receives the current blob and
/// returns the blob to store, or `None` to leave the key untouched.
pub type UpdateFn<'a> = dyn FnMut(Option<String>) -> Result<Option<String>, StoreError> + 'a;

/// String-keyed blob store. Reads never fail: a missing key is `None`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    /// Runs `apply` exactly once while holding the write lock, so concurrent
    /// updates of the same key never lose each other's changes.
    fn update(&self, key: &str, apply: &mut UpdateFn<'_>) -> Result<(), StoreError>;
}

/// Typed JSON access on top of any [`KeyValueStore`].
pub trait TypedStoreExt {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T>;
    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> TypedStoreExt for S {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("⚠️  Ignoring corrupt blob under '{}': {}", key, e);
                None
            }
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_typed_roundtrip_through_dyn_store() {
        let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        let mut map = HashMap::new();
        map.insert("a".to_string(), 1u32);

        store.set_json("numbers", &map).unwrap();
        let loaded: HashMap<String, u32> = store.get_json("numbers").unwrap();
        assert_eq!(loaded.get("a"), Some(&1));
    }

    #[test]
    fn test_update_skips_write_when_callback_declines() {
        let store = MemoryStore::new();
        store.set("k", "kept".into()).unwrap();

        store.update("k", &mut |current: Option<String>| {
            assert_eq!(current.as_deref(), Some("kept"));
            Ok(None)
        })
        .unwrap();
        assert_eq!(store.get("k").as_deref(), Some("kept"));

        let err = store.update("k", &mut |_| Err(StoreError::Unreadable("k".into())));
        assert!(err.is_err());
        assert_eq!(store.get("k").as_deref(), Some("kept"));
    }

    #[test]
    fn test_corrupt_blob_reads_as_absent() {
        let store = MemoryStore::new();
        store.set("numbers", "{not json".to_string()).unwrap();
        let loaded: Option<HashMap<String, u32>> = store.get_json("numbers");
        assert!(loaded.is_none());
    }
}
