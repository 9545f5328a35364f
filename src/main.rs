mod api;
mod config;
mod middleware;
mod models;
mod seeds;
mod services;
mod state;
mod storage;
mod utils;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::services::{MigrationMode, WebhookClient};
use crate::state::AppState;
use crate::storage::{JsonFileStore, KeyValueStore, MemoryStore, SettingsStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env();

    log::info!("🚀 Starting AX Pro Service...");
    let kv: Arc<dyn KeyValueStore> = match &config.settings_store_path {
        Some(path) => {
            log::info!("💾 Settings store: {}", path);
            let store = JsonFileStore::open(path).map_err(|e| {
                log::error!("❌ Failed to open settings store: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
            })?;
            Arc::new(store)
        }
        None => {
            log::warn!("⚠️  SETTINGS_STORE_PATH is blank, settings are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    // 🌱 Identity rule table (file or built-in)
    let rules = seeds::load_rules(config.identity_rules_file.as_deref());
    log::info!("✅ {} identity rules loaded", rules.rules.len());

    let migration_mode = MigrationMode::from_flag(config.enforce_organization_defaults);
    log::info!("🔁 Settings migration mode: {:?}", migration_mode);

    let state = AppState::new(
        SettingsStore::new(kv),
        rules,
        WebhookClient::new(config.webhook_timeout),
        migration_mode,
        config.supabase_timeout,
    );
    let state_data = web::Data::new(state);

    let host = config.host.clone();
    let port = config.port.clone();

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CACHE_CONTROL,
                actix_web::http::header::PRAGMA,
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);
        for origin in &config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();
        let jwt = config.jwt.clone();

        App::new()
            .app_data(state_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            .configure(|cfg| api::routes(cfg, &jwt))
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
