use std::env;
use std::time::Duration;

use crate::services::auth_service::JwtSettings;
use crate::services::webhook_service::DEFAULT_WEBHOOK_TIMEOUT_SECS;

/// Configuration read from the environment (after `.env` is loaded)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: String,
    /// `None` (blank variable) keeps settings in memory only
    pub settings_store_path: Option<String>,
    pub identity_rules_file: Option<String>,
    pub jwt: JwtSettings,
    pub webhook_timeout: Duration,
    pub supabase_timeout: Duration,
    pub enforce_organization_defaults: bool,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            log::warn!("⚠️  JWT_SECRET not set, using the development secret");
            "default-secret-change-me".to_string()
        });

        Self {
            host: get("HOST", "0.0.0.0"),
            port: get("PORT", "3002"),
            settings_store_path: Some(get("SETTINGS_STORE_PATH", "data/settings-store.json"))
                .filter(|p| !p.trim().is_empty()),
            identity_rules_file: lookup("IDENTITY_RULES_FILE").filter(|p| !p.trim().is_empty()),
            jwt: JwtSettings {
                secret: jwt_secret,
                issuer: get("JWT_ISSUER", "axpro-auth"),
                audience: get("JWT_AUDIENCE", "axpro-web"),
            },
            webhook_timeout: Duration::from_secs(parse_secs(
                lookup("WEBHOOK_TIMEOUT_SECS"),
                DEFAULT_WEBHOOK_TIMEOUT_SECS,
            )),
            supabase_timeout: Duration::from_secs(parse_secs(lookup("SUPABASE_TIMEOUT_SECS"), 10)),
            enforce_organization_defaults: parse_bool(lookup("ENFORCE_ORGANIZATION_DEFAULTS")),
            allowed_origins: get(
                "ALLOWED_ORIGINS",
                "http://localhost:3000,http://localhost:5173,http://127.0.0.1:3000",
            )
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect(),
        }
    }
}

fn parse_secs(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default)
}

fn parse_bool(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
