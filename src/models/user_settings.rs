use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuração de webhook n8n (uma entrada da lista `n8nConfigs`)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct N8nConfig {
    pub id: String,
    pub name: String,
    pub webhook_url: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Par URL + anon key do Supabase
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
        }
    }

    /// Blank url or key counts as "not configured" during resolution.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }
}

/// Registro de configurações por usuário, chave = `user_id`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub n8n_configs: Vec<N8nConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_n8n_config_id: Option<String>,
    #[serde(default)]
    pub supabase_config: SupabaseConfig,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub api_configs: Vec<Value>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub ui_customization: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    /// Config referenced by `active_n8n_config_id`, falling back to the first entry.
    pub fn active_n8n_config(&self) -> Option<&N8nConfig> {
        pick_active_config(&self.n8n_configs, self.active_n8n_config_id.as_deref())
    }
}

/// Picks the config whose id matches `active_id`, or the first one when the id
/// is missing or dangling.
pub fn pick_active_config<'a>(
    configs: &'a [N8nConfig],
    active_id: Option<&str>,
) -> Option<&'a N8nConfig> {
    active_id
        .and_then(|id| configs.iter().find(|c| c.id == id))
        .or_else(|| configs.first())
}

/// Partial update for `PATCH /api/v1/settings`
#[derive(Debug, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSettingsUpdate {
    #[serde(default)]
    #[schema(value_type = Option<Vec<Object>>)]
    pub api_configs: Option<Vec<Value>>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub ui_customization: Option<Value>,
}

/// Incoming webhook config; `id` is generated when absent
#[derive(Debug, Deserialize, Clone, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct N8nConfigInput {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub webhook_url: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveN8nConfigsRequest {
    pub configs: Vec<N8nConfigInput>,
    #[serde(default)]
    pub active_config_id: Option<String>,
    /// Writes the universal override too (admin only)
    #[serde(default)]
    pub universal: bool,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveN8nConfigRequest {
    pub config_id: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveSupabaseConfigRequest {
    pub url: String,
    pub anon_key: String,
    #[serde(default)]
    pub universal: bool,
}

fn default_true() -> bool {
    true
}
