// ==================== SETTINGS MIGRATION ====================
// Executado no bootstrap da sessão. Materializa o registro do usuário a partir
// dos valores globais legados e da tabela de regras. Idempotente.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    models::{pick_active_config, SessionIdentity, SupabaseConfig, UserSettings},
    seeds::{create_default_user_settings, RuleSet},
    storage::{settings_store::LegacyGlobals, SettingsStore},
    utils::error::StoreError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationMode {
    /// Only users without a record are touched
    #[default]
    PreserveUser,
    /// Also re-applies the organization webhook/database pair on every
    /// bootstrap, discarding per-user customization of those fields
    EnforceOrganization,
}

impl MigrationMode {
    pub fn from_flag(enforce: bool) -> Self {
        if enforce {
            MigrationMode::EnforceOrganization
        } else {
            MigrationMode::PreserveUser
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
    /// A new record was written for this user
    pub created: bool,
    /// Organization defaults overwrote stored values
    pub enforced: bool,
    pub settings: UserSettings,
}

/// Aplica os valores legados sobre o registro padrão recém-criado
fn apply_legacy(settings: &mut UserSettings, legacy: &LegacyGlobals) {
    if !legacy.n8n_configs.is_empty() {
        settings.n8n_configs = legacy.n8n_configs.clone();
        settings.active_n8n_config_id =
            pick_active_config(&settings.n8n_configs, legacy.active_n8n_config_id.as_deref())
                .map(|c| c.id.clone());
    }

    if let (Some(url), Some(key)) = (&legacy.supabase_url, &legacy.supabase_anon_key) {
        settings.supabase_config = SupabaseConfig::new(url, key);
    }
}

/// Returns true when the stored values had to change.
fn enforce_organization(settings: &mut UserSettings, rules: &RuleSet, now: DateTime<Utc>) -> bool {
    let bundle = rules.organization_bundle();
    let org_id = bundle.config_id();
    let org_supabase = bundle.supabase_config();

    let already_applied = settings.n8n_configs.len() == 1
        && settings.n8n_configs[0].id == org_id
        && settings.n8n_configs[0].webhook_url == bundle.webhook_url
        && settings.active_n8n_config_id.as_deref() == Some(org_id.as_str())
        && settings.supabase_config == org_supabase;

    if already_applied {
        return false;
    }

    settings.n8n_configs = vec![bundle.n8n_config(now)];
    settings.active_n8n_config_id = Some(org_id);
    settings.supabase_config = org_supabase;
    settings.updated_at = now;
    true
}

/// Garante que o usuário tenha um registro de configurações.
///
/// Em `PreserveUser`, um usuário já migrado não é alterado. Em
/// `EnforceOrganization`, o par organizacional é regravado apenas quando
/// difere do armazenado, então execuções repetidas não mudam o estado.
pub fn migrate_user_settings(
    store: &SettingsStore,
    rules: &RuleSet,
    identity: &SessionIdentity,
    mode: MigrationMode,
) -> Result<MigrationOutcome, StoreError> {
    let now = Utc::now();
    let legacy = store.legacy_globals();

    let (settings, created, enforced) = store.update_user(&identity.user_id, |existing| {
        let (mut settings, created) = match existing {
            Some(existing) => (existing, false),
            None => {
                let mut fresh =
                    create_default_user_settings(rules, &identity.user_id, &identity.email, now);
                if legacy != LegacyGlobals::default() {
                    log::info!("📦 Applying legacy global settings to user {}", identity.user_id);
                }
                apply_legacy(&mut fresh, &legacy);
                (fresh, true)
            }
        };

        let enforced = match mode {
            MigrationMode::PreserveUser => false,
            MigrationMode::EnforceOrganization => enforce_organization(&mut settings, rules, now),
        };

        let write = (created || enforced).then(|| settings.clone());
        (write, (settings, created, enforced))
    })?;

    if created || enforced {
        log::info!(
            "✅ Settings migrated for user {} (created: {}, enforced: {})",
            identity.user_id,
            created,
            enforced
        );
    } else {
        log::debug!("ℹ️  Settings already present for user {}", identity.user_id);
    }

    Ok(MigrationOutcome {
        created,
        enforced,
        settings,
    })
}
