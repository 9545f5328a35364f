use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AX Pro Service API",
        version = "1.0.0",
        description = "Per-user settings resolution and the n8n chat bridge for AX Pro. \n\n**Authentication:** every `/api/v1` endpoint requires a JWT Bearer token.\n\n**Resolution order:** universal override, then the user's own record, then the identity rule default.",
        contact(
            name = "AX Pro Team",
            email = "admin@axpro.ac.kr"
        )
    ),
    paths(
        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Session
        crate::api::session::bootstrap,

        // Settings
        crate::api::settings::get_settings,
        crate::api::settings::update_settings,
        crate::api::settings::get_active,
        crate::api::settings::save_n8n_configs,
        crate::api::settings::set_active_n8n,
        crate::api::settings::save_supabase,
        crate::api::settings::get_universal,
        crate::api::settings::save_universal,
        crate::api::settings::clear_universal,

        // Chat
        crate::api::chat::send_message,

        // Prompts
        crate::api::prompts::get_latest,
        crate::api::prompts::get_history,
        crate::api::prompts::create_prompt,
    ),
    components(
        schemas(
            // Health & Metrics
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,

            // Settings
            crate::models::N8nConfig,
            crate::models::SupabaseConfig,
            crate::models::UserSettings,
            crate::models::UniversalOverrides,
            crate::models::UserSettingsUpdate,
            crate::models::N8nConfigInput,
            crate::models::SaveN8nConfigsRequest,
            crate::models::SetActiveN8nConfigRequest,
            crate::models::SaveSupabaseConfigRequest,
            crate::services::settings_service::ActiveConfiguration,
            crate::services::settings_service::ConfigSource,
            crate::services::MigrationOutcome,
            crate::api::session::BootstrapResponse,

            // Identity
            crate::models::UserRole,
            crate::models::SessionIdentity,

            // Chat
            crate::models::ChatMessageRequest,
            crate::models::ChatAnswer,
            crate::models::ChatMessageResponse,

            // Prompts
            crate::models::Prompt,
            crate::models::CreatePromptRequest,
            crate::models::PromptPage,
        )
    ),
    tags(
        (name = "Health", description = "Health check and system metrics endpoints for monitoring service status."),
        (name = "Session", description = "Session bootstrap. Ensures the caller has a settings record and applies organization defaults when enforced."),
        (name = "Settings", description = "Per-user webhook and database settings plus organization-wide overrides (admin)."),
        (name = "Chat", description = "Chat messages relayed to the caller's active n8n webhook."),
        (name = "Prompts", description = "System prompts stored in the caller's Supabase database."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT issued by the AX Pro auth service"))
                        .build()
                ),
            );
        }
    }
}
