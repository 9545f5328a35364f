use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{N8nConfig, SupabaseConfig, UserSettings};

/// Pacote de configuração aplicado a uma identidade
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigBundle {
    /// Used to derive the default config id (`default-<name>`)
    pub name: String,
    pub n8n_name: String,
    pub webhook_url: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl ConfigBundle {
    pub fn config_id(&self) -> String {
        format!("default-{}", self.name)
    }

    pub fn n8n_config(&self, now: DateTime<Utc>) -> N8nConfig {
        N8nConfig {
            id: self.config_id(),
            name: self.n8n_name.clone(),
            webhook_url: self.webhook_url.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn supabase_config(&self) -> SupabaseConfig {
        SupabaseConfig::new(&self.supabase_url, &self.supabase_anon_key)
    }
}

/// Regra: casa por `user_id` exato ou por `email` exato
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRule {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub bundle: ConfigBundle,
}

impl IdentityRule {
    fn matches(&self, user_id: &str, email: &str) -> bool {
        self.user_id.as_deref() == Some(user_id) || self.email.as_deref() == Some(email)
    }
}

/// Tabela declarativa identidade -> pacote de configuração.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<IdentityRule>,
    pub fallback: ConfigBundle,
    /// Pair re-applied on every bootstrap in enforcing mode
    #[serde(default)]
    pub organization: Option<ConfigBundle>,
}

impl RuleSet {
    /// First rule whose user id or email matches, else the fallback bundle.
    pub fn match_identity(&self, user_id: &str, email: &str) -> &ConfigBundle {
        self.rules
            .iter()
            .find(|rule| rule.matches(user_id, email))
            .map(|rule| &rule.bundle)
            .unwrap_or(&self.fallback)
    }

    pub fn organization_bundle(&self) -> &ConfigBundle {
        self.organization.as_ref().unwrap_or(&self.fallback)
    }

    pub fn builtin() -> Self {
        BUILTIN_RULES.clone()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&raw).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }
}

lazy_static::lazy_static! {
    static ref BUILTIN_RULES: RuleSet = build_builtin_rules();
}

const N8N_BASE: &str = "https://n8n.axpro.ac.kr/webhook";

fn bundle(name: &str, n8n_name: &str, hook: &str, supabase_ref: &str) -> ConfigBundle {
    ConfigBundle {
        name: name.into(),
        n8n_name: n8n_name.into(),
        webhook_url: format!("{}/{}", N8N_BASE, hook),
        supabase_url: format!("https://{}.supabase.co", supabase_ref),
        supabase_anon_key: format!("{}-anon-key", supabase_ref),
    }
}

/// Contas conhecidas da plataforma: professor, admin e usuário genérico
fn build_builtin_rules() -> RuleSet {
    let fallback = bundle("fallback", "AX Pro Chat", "axpro-chat", "axpro");

    RuleSet {
        rules: vec![
            IdentityRule {
                user_id: Some("professor-001".into()),
                email: Some("professor@axpro.ac.kr".into()),
                bundle: bundle("professor", "Professor Assistant", "professor-chat", "axpro-professor"),
            },
            IdentityRule {
                user_id: Some("admin-001".into()),
                email: Some("admin@axpro.ac.kr".into()),
                bundle: bundle("admin", "Admin Console", "admin-chat", "axpro-admin"),
            },
            IdentityRule {
                user_id: Some("user-001".into()),
                email: Some("user@axpro.ac.kr".into()),
                bundle: bundle("user", "Student Chat", "student-chat", "axpro"),
            },
        ],
        organization: Some(fallback.clone()),
        fallback,
    }
}

/// Carrega a tabela de regras: arquivo JSON quando configurado, senão a embutida
pub fn load_rules(path: Option<&str>) -> RuleSet {
    let Some(path) = path else {
        log::info!("📋 Identity rules: using built-in table");
        return RuleSet::builtin();
    };

    match RuleSet::from_file(path) {
        Ok(rules) => {
            log::info!("📋 Identity rules: loaded {} rules from {}", rules.rules.len(), path);
            rules
        }
        Err(e) => {
            log::error!("❌ {}, falling back to built-in identity rules", e);
            RuleSet::builtin()
        }
    }
}

/// Cria o registro padrão completo de um usuário a partir da tabela de regras.
/// Determinístico para o mesmo `(user_id, email, now)`; nunca falha.
pub fn create_default_user_settings(
    rules: &RuleSet,
    user_id: &str,
    email: &str,
    now: DateTime<Utc>,
) -> UserSettings {
    let bundle = rules.match_identity(user_id, email);
    let config = bundle.n8n_config(now);

    UserSettings {
        user_id: user_id.to_string(),
        email: email.to_string(),
        active_n8n_config_id: Some(config.id.clone()),
        n8n_configs: vec![config],
        supabase_config: bundle.supabase_config(),
        api_configs: Vec::new(),
        ui_customization: Value::Object(Default::default()),
        created_at: now,
        updated_at: now,
    }
}
