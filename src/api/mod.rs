pub mod chat;
pub mod health;
pub mod metrics;
pub mod prompts;
pub mod session;
pub mod settings;
pub mod swagger;

use actix_web::web;

use crate::middleware::AuthMiddleware;
use crate::services::auth_service::JwtSettings;

/// Registers every route. Everything under `/api/v1` requires a bearer token.
pub fn routes(cfg: &mut web::ServiceConfig, jwt: &JwtSettings) {
    cfg
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Metrics
        .route("/metrics", web::get().to(metrics::get_metrics))
        .service(
            web::scope("/api/v1")
                .wrap(AuthMiddleware::new(jwt.clone()))
                // Session bootstrap: migração das configurações
                .route("/session/bootstrap", web::post().to(session::bootstrap))
                // Settings
                .service(
                    web::scope("/settings")
                        .route("", web::get().to(settings::get_settings))
                        .route("", web::patch().to(settings::update_settings))
                        .route("/active", web::get().to(settings::get_active))
                        .route("/n8n", web::put().to(settings::save_n8n_configs))
                        .route("/n8n/active", web::post().to(settings::set_active_n8n))
                        .route("/supabase", web::put().to(settings::save_supabase))
                        .route("/universal", web::get().to(settings::get_universal))
                        .route("/universal", web::put().to(settings::save_universal))
                        .route("/universal", web::delete().to(settings::clear_universal)),
                )
                // Chat via n8n webhook
                .route("/chat/messages", web::post().to(chat::send_message))
                // Prompts (Supabase)
                .service(
                    web::scope("/prompts")
                        .route("", web::get().to(prompts::get_history))
                        .route("", web::post().to(prompts::create_prompt))
                        .route("/latest", web::get().to(prompts::get_latest)),
                ),
        );
}
