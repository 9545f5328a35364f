use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{KeyValueStore, UpdateFn};
use crate::utils::error::StoreError;

/// Store persistido em um único arquivo JSON (`{ chave: blob }`).
///
/// O arquivo é lido uma vez na abertura e reescrito inteiro a cada `set`
/// (arquivo temporário + rename). Processos concorrentes no mesmo arquivo não
/// são coordenados: o último a gravar vence.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                HashMap::new()
            } else {
                match serde_json::from_str(&raw) {
                    Ok(entries) => entries,
                    Err(e) => {
                        log::warn!("⚠️  Settings store {} is corrupt, starting empty: {}", path.display(), e);
                        HashMap::new()
                    }
                }
            }
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            HashMap::new()
        };

        log::info!("💾 Settings store opened at {} ({} keys)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn update(&self, key: &str, apply: &mut UpdateFn<'_>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        if let Some(value) = apply(entries.get(key).cloned())? {
            entries.insert(key.to_string(), value);
            self.flush(&entries)?;
        }
        Ok(())
    }
}
