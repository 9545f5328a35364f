use serde::{Deserialize, Serialize};

use super::user_settings::{N8nConfig, SupabaseConfig};

/// Overrides válidos para toda a organização.
/// Cada campo presente substitui o equivalente de qualquer usuário.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UniversalOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n8n_configs: Option<Vec<N8nConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_n8n_config_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_config: Option<SupabaseConfig>,
}

impl UniversalOverrides {
    /// Override list, ignoring an empty one.
    pub fn n8n_configs(&self) -> Option<&[N8nConfig]> {
        self.n8n_configs
            .as_deref()
            .filter(|configs| !configs.is_empty())
    }

    pub fn supabase_config(&self) -> Option<&SupabaseConfig> {
        self.supabase_config.as_ref().filter(|c| c.is_configured())
    }

    pub fn is_empty(&self) -> bool {
        self.n8n_configs().is_none()
            && self.active_n8n_config_id.is_none()
            && self.supabase_config().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_are_not_overrides() {
        let overrides = UniversalOverrides {
            n8n_configs: Some(vec![]),
            active_n8n_config_id: None,
            supabase_config: Some(SupabaseConfig::default()),
        };
        assert!(overrides.n8n_configs().is_none());
        assert!(overrides.supabase_config().is_none());
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_absent_fields_are_omitted_on_the_wire() {
        let overrides = UniversalOverrides {
            active_n8n_config_id: Some("org".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&overrides).unwrap();
        assert_eq!(json, r#"{"activeN8nConfigId":"org"}"#);
    }
}
