// ==================== USER SETTINGS ====================
// Resolução em três níveis: override universal -> registro do usuário -> padrão.
// `get_*` nunca falham; `save_*` fazem merge parcial e persistem o mapa inteiro.

use chrono::Utc;
use serde::Serialize;

use crate::{
    models::{
        pick_active_config, N8nConfig, N8nConfigInput, SessionIdentity, SupabaseConfig,
        UniversalOverrides, UserSettings, UserSettingsUpdate,
    },
    seeds::{create_default_user_settings, RuleSet},
    storage::SettingsStore,
    utils::error::AppError,
};

/// Origem de um valor resolvido
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Universal,
    User,
    Default,
}

/// Configuração efetivamente em vigor para um usuário
#[derive(Debug, Serialize, Clone, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveConfiguration {
    pub n8n_configs: Vec<N8nConfig>,
    pub active_n8n_config: N8nConfig,
    pub supabase_config: SupabaseConfig,
    pub n8n_source: ConfigSource,
    pub supabase_source: ConfigSource,
}

// ==================== RESOLUTION ====================

/// Webhook list: override -> user record -> rule-table default.
pub fn resolve_n8n_configs(
    overrides: &UniversalOverrides,
    record: Option<&UserSettings>,
    defaults: &UserSettings,
) -> (Vec<N8nConfig>, ConfigSource) {
    if let Some(configs) = overrides.n8n_configs() {
        return (configs.to_vec(), ConfigSource::Universal);
    }
    if let Some(record) = record.filter(|r| !r.n8n_configs.is_empty()) {
        return (record.n8n_configs.clone(), ConfigSource::User);
    }
    (defaults.n8n_configs.clone(), ConfigSource::Default)
}

/// Active id candidate follows the same order; a dangling id falls back to
/// the first config of the resolved list.
pub fn resolve_active_n8n_config(
    overrides: &UniversalOverrides,
    record: Option<&UserSettings>,
    configs: &[N8nConfig],
) -> Option<N8nConfig> {
    let candidate = overrides
        .active_n8n_config_id
        .as_deref()
        .or_else(|| record.and_then(|r| r.active_n8n_config_id.as_deref()));

    pick_active_config(configs, candidate).cloned()
}

pub fn resolve_supabase_config(
    overrides: &UniversalOverrides,
    record: Option<&UserSettings>,
    defaults: &UserSettings,
) -> (SupabaseConfig, ConfigSource) {
    if let Some(config) = overrides.supabase_config() {
        return (config.clone(), ConfigSource::Universal);
    }
    if let Some(record) = record.filter(|r| r.supabase_config.is_configured()) {
        return (record.supabase_config.clone(), ConfigSource::User);
    }
    (defaults.supabase_config.clone(), ConfigSource::Default)
}

fn defaults_for(rules: &RuleSet, identity: &SessionIdentity) -> UserSettings {
    create_default_user_settings(rules, &identity.user_id, &identity.email, Utc::now())
}

// ==================== ACCESSORS ====================

/// Registro armazenado do usuário, ou o padrão da tabela de regras (sem gravar)
pub fn get_user_settings(
    store: &SettingsStore,
    rules: &RuleSet,
    identity: &SessionIdentity,
) -> UserSettings {
    store
        .get_user(&identity.user_id)
        .unwrap_or_else(|| defaults_for(rules, identity))
}

pub fn get_universal_overrides(store: &SettingsStore) -> UniversalOverrides {
    store.overrides()
}

pub fn get_active_configuration(
    store: &SettingsStore,
    rules: &RuleSet,
    identity: &SessionIdentity,
) -> ActiveConfiguration {
    let overrides = store.overrides();
    let record = store.get_user(&identity.user_id);
    let defaults = defaults_for(rules, identity);

    let (mut n8n_configs, mut n8n_source) =
        resolve_n8n_configs(&overrides, record.as_ref(), &defaults);
    if n8n_configs.is_empty() {
        // Only reachable with a rule table producing no config
        n8n_configs = defaults.n8n_configs.clone();
        n8n_source = ConfigSource::Default;
    }

    let active_n8n_config = resolve_active_n8n_config(&overrides, record.as_ref(), &n8n_configs)
        .or_else(|| defaults.active_n8n_config().cloned())
        .unwrap_or_else(|| rules.fallback.n8n_config(Utc::now()));

    let (supabase_config, supabase_source) =
        resolve_supabase_config(&overrides, record.as_ref(), &defaults);

    ActiveConfiguration {
        n8n_configs,
        active_n8n_config,
        supabase_config,
        n8n_source,
        supabase_source,
    }
}

pub fn get_user_n8n_configs(
    store: &SettingsStore,
    rules: &RuleSet,
    identity: &SessionIdentity,
) -> Vec<N8nConfig> {
    get_active_configuration(store, rules, identity).n8n_configs
}

pub fn get_user_active_n8n_config(
    store: &SettingsStore,
    rules: &RuleSet,
    identity: &SessionIdentity,
) -> N8nConfig {
    get_active_configuration(store, rules, identity).active_n8n_config
}

pub fn get_user_supabase_config(
    store: &SettingsStore,
    rules: &RuleSet,
    identity: &SessionIdentity,
) -> SupabaseConfig {
    get_active_configuration(store, rules, identity).supabase_config
}

// ==================== MUTATORS ====================

fn load_or_create(store: &SettingsStore, rules: &RuleSet, identity: &SessionIdentity) -> UserSettings {
    store.get_user(&identity.user_id).unwrap_or_else(|| {
        log::info!("🆕 Creating settings record for user {} on first save", identity.user_id);
        defaults_for(rules, identity)
    })
}

fn persist(store: &SettingsStore, mut settings: UserSettings) -> Result<UserSettings, AppError> {
    settings.updated_at = Utc::now();
    store.put_user(settings.clone())?;
    Ok(settings)
}

/// Saves the caller's record together with a new universal override. The
/// override goes first; if the record cannot be written the previous
/// override is put back so the pair is applied together or not at all.
fn persist_with_overrides(
    store: &SettingsStore,
    settings: UserSettings,
    overrides: &UniversalOverrides,
) -> Result<UserSettings, AppError> {
    let previous = store.overrides();
    store.save_overrides(overrides)?;

    persist(store, settings).map_err(|e| {
        log::error!("❌ User record not saved, restoring previous universal overrides: {}", e);
        if let Err(restore) = store.save_overrides(&previous) {
            log::error!("❌ Could not restore universal overrides: {}", restore);
        }
        e
    })
}

fn require_admin(identity: &SessionIdentity) -> Result<(), AppError> {
    if identity.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only admins can change the universal configuration".to_string(),
        ))
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), AppError> {
    let url = reqwest::Url::parse(value.trim())
        .map_err(|e| AppError::InvalidRequest(format!("{} '{}' is not a valid URL: {}", field, value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::InvalidRequest(format!(
            "{} must use http or https, got '{}'",
            field, other
        ))),
    }
}

/// Converte entradas em configs, preservando `created_at` de ids já conhecidos
fn build_configs(inputs: Vec<N8nConfigInput>, existing: &[N8nConfig]) -> Result<Vec<N8nConfig>, AppError> {
    if inputs.is_empty() {
        return Err(AppError::InvalidRequest("At least one webhook config is required".to_string()));
    }

    let now = Utc::now();
    let mut configs: Vec<N8nConfig> = Vec::with_capacity(inputs.len());

    for input in inputs {
        validate_http_url("webhookUrl", &input.webhook_url)?;
        if input.name.trim().is_empty() {
            return Err(AppError::InvalidRequest("Webhook config name cannot be empty".to_string()));
        }

        let id = input
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if configs.iter().any(|c| c.id == id) {
            return Err(AppError::InvalidRequest(format!("Duplicate webhook config id '{}'", id)));
        }

        let created_at = existing
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.created_at)
            .unwrap_or(now);

        configs.push(N8nConfig {
            id,
            name: input.name.trim().to_string(),
            webhook_url: input.webhook_url.trim().to_string(),
            is_active: input.is_active,
            created_at,
            updated_at: now,
        });
    }

    Ok(configs)
}

/// Merge parcial de `apiConfigs` / `uiCustomization`
pub fn save_user_settings(
    store: &SettingsStore,
    rules: &RuleSet,
    identity: &SessionIdentity,
    update: UserSettingsUpdate,
) -> Result<UserSettings, AppError> {
    let mut settings = load_or_create(store, rules, identity);

    if let Some(api_configs) = update.api_configs {
        settings.api_configs = api_configs;
    }
    if let Some(ui) = update.ui_customization {
        merge_json(&mut settings.ui_customization, ui);
    }
    settings.email = identity.email.clone();

    persist(store, settings)
}

/// Objects merge key by key; anything else replaces the old value.
fn merge_json(target: &mut serde_json::Value, patch: serde_json::Value) {
    match (target, patch) {
        (serde_json::Value::Object(target), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                merge_json(target.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}

/// Substitui a lista de webhooks do usuário; com `universal`, grava também o override
pub fn save_user_n8n_configs(
    store: &SettingsStore,
    rules: &RuleSet,
    identity: &SessionIdentity,
    inputs: Vec<N8nConfigInput>,
    active_config_id: Option<String>,
    universal: bool,
) -> Result<UserSettings, AppError> {
    if universal {
        require_admin(identity)?;
    }

    let mut settings = load_or_create(store, rules, identity);
    let configs = build_configs(inputs, &settings.n8n_configs)?;

    let active_id = pick_active_config(&configs, active_config_id.as_deref())
        .map(|c| c.id.clone());

    let overrides = universal.then(|| {
        let mut overrides = store.overrides();
        overrides.n8n_configs = Some(configs.clone());
        overrides.active_n8n_config_id = active_id.clone();
        overrides
    });

    settings.n8n_configs = configs;
    settings.active_n8n_config_id = active_id;

    match overrides {
        Some(overrides) => {
            let saved = persist_with_overrides(store, settings, &overrides)?;
            log::info!(
                "🌐 Universal webhook configs replaced by {} ({} configs)",
                identity.user_id,
                saved.n8n_configs.len()
            );
            Ok(saved)
        }
        None => persist(store, settings),
    }
}

pub fn set_active_n8n_config(
    store: &SettingsStore,
    rules: &RuleSet,
    identity: &SessionIdentity,
    config_id: &str,
) -> Result<UserSettings, AppError> {
    let mut settings = load_or_create(store, rules, identity);

    if !settings.n8n_configs.iter().any(|c| c.id == config_id) {
        return Err(AppError::NotFound(format!("Webhook config '{}' not found", config_id)));
    }

    settings.active_n8n_config_id = Some(config_id.to_string());
    persist(store, settings)
}

pub fn save_user_supabase_config(
    store: &SettingsStore,
    rules: &RuleSet,
    identity: &SessionIdentity,
    config: SupabaseConfig,
    universal: bool,
) -> Result<UserSettings, AppError> {
    if universal {
        require_admin(identity)?;
    }
    validate_http_url("url", &config.url)?;
    if config.anon_key.trim().is_empty() {
        return Err(AppError::InvalidRequest("anonKey cannot be empty".to_string()));
    }

    let config = SupabaseConfig::new(config.url.trim(), config.anon_key.trim());

    let mut settings = load_or_create(store, rules, identity);
    settings.supabase_config = config.clone();

    if universal {
        let mut overrides = store.overrides();
        overrides.supabase_config = Some(config);
        let saved = persist_with_overrides(store, settings, &overrides)?;
        log::info!("🌐 Universal database config replaced by {}", identity.user_id);
        Ok(saved)
    } else {
        persist(store, settings)
    }
}

pub fn save_universal_overrides(
    store: &SettingsStore,
    identity: &SessionIdentity,
    overrides: UniversalOverrides,
) -> Result<UniversalOverrides, AppError> {
    require_admin(identity)?;

    if let Some(configs) = &overrides.n8n_configs {
        for config in configs {
            validate_http_url("webhookUrl", &config.webhook_url)?;
        }
    }
    if let Some(config) = &overrides.supabase_config {
        validate_http_url("url", &config.url)?;
    }

    store.save_overrides(&overrides)?;
    log::info!("🌐 Universal overrides saved by {}", identity.user_id);
    Ok(overrides)
}

pub fn clear_universal_overrides(
    store: &SettingsStore,
    identity: &SessionIdentity,
) -> Result<(), AppError> {
    require_admin(identity)?;
    store.clear_overrides()?;
    log::info!("🧹 Universal overrides cleared by {}", identity.user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::storage::{settings_store::USER_SETTINGS_KEY, KeyValueStore, MemoryStore, UpdateFn};
    use crate::utils::error::StoreError;
    use std::sync::Arc;

    /// Accepts every write except the per-user settings mapping
    #[derive(Default)]
    struct RejectsUserRecords {
        inner: MemoryStore,
    }

    impl KeyValueStore for RejectsUserRecords {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }

        fn update(&self, key: &str, apply: &mut UpdateFn<'_>) -> Result<(), StoreError> {
            if key == USER_SETTINGS_KEY {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.update(key, apply)
        }
    }

    fn setup() -> (SettingsStore, RuleSet) {
        (SettingsStore::new(Arc::new(MemoryStore::new())), RuleSet::builtin())
    }

    fn student() -> SessionIdentity {
        SessionIdentity::new("student-9", "student9@uni.test", UserRole::User)
    }

    fn admin() -> SessionIdentity {
        SessionIdentity::new("admin-001", "admin@axpro.ac.kr", UserRole::Admin)
    }

    fn input(id: &str, url: &str) -> N8nConfigInput {
        N8nConfigInput {
            id: Some(id.to_string()),
            name: id.to_string(),
            webhook_url: url.to_string(),
            is_active: true,
        }
    }

    #[test]
    fn test_defaults_when_nothing_is_stored() {
        let (store, rules) = setup();
        let active = get_active_configuration(&store, &rules, &student());

        assert_eq!(active.n8n_source, ConfigSource::Default);
        assert_eq!(active.supabase_source, ConfigSource::Default);
        assert_eq!(active.active_n8n_config.webhook_url, rules.fallback.webhook_url);
        assert!(store.get_user("student-9").is_none());
    }

    #[test]
    fn test_user_record_beats_default() {
        let (store, rules) = setup();
        let user = student();
        save_user_n8n_configs(
            &store,
            &rules,
            &user,
            vec![input("mine", "https://hooks.test/mine"), input("other", "https://hooks.test/other")],
            Some("other".into()),
            false,
        )
        .unwrap();

        let active = get_user_active_n8n_config(&store, &rules, &user);
        assert_eq!(active.id, "other");
        assert_eq!(get_user_n8n_configs(&store, &rules, &user).len(), 2);
    }

    #[test]
    fn test_universal_override_beats_user_record() {
        let (store, rules) = setup();
        let user = student();
        save_user_n8n_configs(&store, &rules, &user, vec![input("mine", "https://hooks.test/mine")], None, false)
            .unwrap();

        save_universal_overrides(
            &store,
            &admin(),
            UniversalOverrides {
                n8n_configs: Some(vec![rules.fallback.n8n_config(Utc::now())]),
                ..Default::default()
            },
        )
        .unwrap();

        let active = get_user_active_n8n_config(&store, &rules, &user);
        assert_eq!(active.webhook_url, rules.fallback.webhook_url);

        // Stored record stays untouched
        assert_eq!(store.get_user("student-9").unwrap().n8n_configs[0].id, "mine");
    }

    #[test]
    fn test_dangling_active_id_uses_first_config() {
        let (store, rules) = setup();
        let user = student();
        save_user_n8n_configs(&store, &rules, &user, vec![input("a", "https://hooks.test/a")], None, false)
            .unwrap();

        store
            .save_overrides(&UniversalOverrides {
                active_n8n_config_id: Some("ghost".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(get_user_active_n8n_config(&store, &rules, &user).id, "a");
    }

    #[test]
    fn test_empty_override_list_is_ignored() {
        let (store, rules) = setup();
        store
            .save_overrides(&UniversalOverrides {
                n8n_configs: Some(vec![]),
                ..Default::default()
            })
            .unwrap();

        let active = get_active_configuration(&store, &rules, &student());
        assert_eq!(active.n8n_source, ConfigSource::Default);
    }

    #[test]
    fn test_universal_save_requires_admin() {
        let (store, rules) = setup();
        let err = save_user_supabase_config(
            &store,
            &rules,
            &student(),
            SupabaseConfig::new("https://org.supabase.co", "key"),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(store.overrides().is_empty());
    }

    #[test]
    fn test_universal_supabase_save_applies_to_everyone() {
        let (store, rules) = setup();
        save_user_supabase_config(&store, &rules, &admin(), SupabaseConfig::new("https://org.supabase.co", "org-key"), true)
            .unwrap();

        let config = get_user_supabase_config(&store, &rules, &student());
        assert_eq!(config.url, "https://org.supabase.co");
    }

    #[test]
    fn test_invalid_webhook_url_is_rejected() {
        let (store, rules) = setup();
        let err = save_user_n8n_configs(&store, &rules, &student(), vec![input("a", "ftp://nope")], None, false)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let err = save_user_n8n_configs(&store, &rules, &student(), vec![], None, false).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[test]
    fn test_missing_config_id_gets_generated() {
        let (store, rules) = setup();
        let mut cfg = input("x", "https://hooks.test/x");
        cfg.id = None;

        let saved = save_user_n8n_configs(&store, &rules, &student(), vec![cfg], None, false).unwrap();
        let id = &saved.n8n_configs[0].id;
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert_eq!(saved.active_n8n_config_id.as_ref(), Some(id));
    }

    #[test]
    fn test_partial_settings_update_merges_ui() {
        let (store, rules) = setup();
        let user = student();

        save_user_settings(
            &store,
            &rules,
            &user,
            UserSettingsUpdate {
                ui_customization: Some(serde_json::json!({"theme": "dark", "fontSize": 14})),
                ..Default::default()
            },
        )
        .unwrap();
        let first = store.get_user("student-9").unwrap();

        let saved = save_user_settings(
            &store,
            &rules,
            &user,
            UserSettingsUpdate {
                ui_customization: Some(serde_json::json!({"fontSize": 16})),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(saved.ui_customization["theme"], "dark");
        assert_eq!(saved.ui_customization["fontSize"], 16);
        assert_eq!(saved.created_at, first.created_at);
        assert!(saved.updated_at >= first.updated_at);
    }

    #[test]
    fn test_set_active_rejects_unknown_id() {
        let (store, rules) = setup();
        let err = set_active_n8n_config(&store, &rules, &student(), "nope").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let ok = set_active_n8n_config(&store, &rules, &student(), "default-fallback").unwrap();
        assert_eq!(ok.active_n8n_config_id.as_deref(), Some("default-fallback"));
    }

    #[test]
    fn test_clear_overrides_restores_user_values() {
        let (store, rules) = setup();
        save_user_supabase_config(&store, &rules, &student(), SupabaseConfig::new("https://mine.supabase.co", "k"), false)
            .unwrap();
        save_user_supabase_config(&store, &rules, &admin(), SupabaseConfig::new("https://org.supabase.co", "k"), true)
            .unwrap();
        assert_eq!(get_user_supabase_config(&store, &rules, &student()).url, "https://org.supabase.co");

        clear_universal_overrides(&store, &admin()).unwrap();
        let active = get_active_configuration(&store, &rules, &student());
        assert_eq!(active.supabase_config.url, "https://mine.supabase.co");
        assert_eq!(active.supabase_source, ConfigSource::User);
    }

    #[test]
    fn test_failed_universal_save_leaves_overrides_unchanged() {
        let store = SettingsStore::new(Arc::new(RejectsUserRecords::default()));
        let rules = RuleSet::builtin();

        let previous = UniversalOverrides {
            supabase_config: Some(SupabaseConfig::new("https://before.supabase.co", "before")),
            ..Default::default()
        };
        store.save_overrides(&previous).unwrap();

        let err = save_user_n8n_configs(
            &store,
            &rules,
            &admin(),
            vec![input("org", "https://hooks.test/org")],
            None,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert_eq!(store.overrides(), previous);

        let err = save_user_supabase_config(
            &store,
            &rules,
            &admin(),
            SupabaseConfig::new("https://after.supabase.co", "after"),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert_eq!(store.overrides(), previous);
    }
}
