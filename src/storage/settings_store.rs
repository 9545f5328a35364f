use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::{KeyValueStore, TypedStoreExt};
use crate::models::{N8nConfig, UniversalOverrides, UserSettings};
use crate::utils::error::StoreError;

pub const USER_SETTINGS_KEY: &str = "axpro_user_settings";
pub const UNIVERSAL_CONFIG_KEY: &str = "axpro_universal_config";

// Chaves legadas (globais), lidas apenas pela migração
pub const LEGACY_N8N_CONFIGS_KEY: &str = "n8n_configs";
pub const LEGACY_ACTIVE_N8N_CONFIG_KEY: &str = "active_n8n_config_id";
pub const LEGACY_SUPABASE_URL_KEY: &str = "supabase_url";
pub const LEGACY_SUPABASE_ANON_KEY_KEY: &str = "supabase_anon_key";

/// Valores globais anteriores ao armazenamento por usuário
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LegacyGlobals {
    pub n8n_configs: Vec<N8nConfig>,
    pub active_n8n_config_id: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
}

/// Typed view over the settings mapping, the universal overrides and the
/// legacy flat keys.
#[derive(Clone)]
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Every record that decodes. Undecodable entries are logged and skipped.
    pub fn load_all(&self) -> HashMap<String, UserSettings> {
        let raw = self.kv.get(USER_SETTINGS_KEY);
        match decode_mapping(raw.as_deref()) {
            Ok(entries) => entries
                .iter()
                .filter_map(|(user_id, value)| {
                    decode_user(user_id, value).map(|settings| (user_id.clone(), settings))
                })
                .collect(),
            Err(e) => {
                log::warn!("⚠️  {}", e);
                HashMap::new()
            }
        }
    }

    pub fn get_user(&self, user_id: &str) -> Option<UserSettings> {
        self.load_all().remove(user_id)
    }

    /// Atomic read-modify-write of one user's record.
    ///
    /// `apply` receives the stored record (`None` when absent or undecodable)
    /// and returns the record to write, or `None` to leave the store as is,
    /// plus a value handed back to the caller. Other users' entries, including
    /// ones that fail to decode, are written back untouched. A mapping blob
    /// that is not a JSON object is never overwritten.
    pub fn update_user<F, R>(&self, user_id: &str, apply: F) -> Result<R, StoreError>
    where
        F: FnOnce(Option<UserSettings>) -> (Option<UserSettings>, R),
    {
        let mut apply = Some(apply);
        let mut output = None;

        self.kv.update(USER_SETTINGS_KEY, &mut |raw: Option<String>| {
            let mut entries = decode_mapping(raw.as_deref())?;
            let current = entries.get(user_id).and_then(|value| decode_user(user_id, value));

            let Some(apply) = apply.take() else {
                return Ok(None);
            };
            let (next, result) = apply(current);
            output = Some(result);

            match next {
                Some(settings) => {
                    entries.insert(user_id.to_string(), serde_json::to_value(&settings)?);
                    Ok(Some(serde_json::to_string(&entries)?))
                }
                None => Ok(None),
            }
        })?;

        // `update` runs the callback once whenever it returns Ok
        output.ok_or(StoreError::Poisoned)
    }

    pub fn put_user(&self, settings: UserSettings) -> Result<(), StoreError> {
        let user_id = settings.user_id.clone();
        self.update_user(&user_id, |_| (Some(settings), ()))
    }

    pub fn overrides(&self) -> UniversalOverrides {
        self.kv.get_json(UNIVERSAL_CONFIG_KEY).unwrap_or_default()
    }

    pub fn save_overrides(&self, overrides: &UniversalOverrides) -> Result<(), StoreError> {
        self.kv.set_json(UNIVERSAL_CONFIG_KEY, overrides)
    }

    pub fn clear_overrides(&self) -> Result<(), StoreError> {
        self.kv.remove(UNIVERSAL_CONFIG_KEY)
    }

    pub fn legacy_globals(&self) -> LegacyGlobals {
        LegacyGlobals {
            n8n_configs: self.kv.get_json(LEGACY_N8N_CONFIGS_KEY).unwrap_or_default(),
            active_n8n_config_id: self.legacy_string(LEGACY_ACTIVE_N8N_CONFIG_KEY),
            supabase_url: self.legacy_string(LEGACY_SUPABASE_URL_KEY),
            supabase_anon_key: self.legacy_string(LEGACY_SUPABASE_ANON_KEY_KEY),
        }
    }

    /// Legacy flat values were written either raw or JSON-quoted.
    fn legacy_string(&self, key: &str) -> Option<String> {
        let raw = self.kv.get(key)?;
        let value = serde_json::from_str::<String>(&raw).unwrap_or(raw);
        let value = value.trim().to_string();
        (!value.is_empty()).then_some(value)
    }
}

fn decode_mapping(raw: Option<&str>) -> Result<Map<String, Value>, StoreError> {
    match raw {
        None => Ok(Map::new()),
        Some(raw) => serde_json::from_str(raw).map_err(|e| {
            log::error!("❌ Settings mapping under '{}' is unreadable: {}", USER_SETTINGS_KEY, e);
            StoreError::Unreadable(USER_SETTINGS_KEY.to_string())
        }),
    }
}

fn decode_user(user_id: &str, value: &Value) -> Option<UserSettings> {
    match serde_json::from_value(value.clone()) {
        Ok(settings) => Some(settings),
        Err(e) => {
            log::warn!("⚠️  Skipping undecodable settings record for '{}': {}", user_id, e);
            None
        }
    }
}
