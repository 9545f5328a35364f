use actix_web::{web, HttpResponse, ResponseError};
use serde::Serialize;

use crate::{
    api::metrics,
    models::SessionIdentity,
    services::migration_service::{self, MigrationOutcome},
    state::AppState,
    utils::error::AppError,
};

/// Bootstrap envelope: `success` plus the migration outcome fields
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BootstrapResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: MigrationOutcome,
}

/// POST /api/v1/session/bootstrap - Executa a migração das configurações do usuário
#[utoipa::path(
    post,
    path = "/api/v1/session/bootstrap",
    tag = "Session",
    responses(
        (status = 200, description = "Settings record ensured for the caller", body = BootstrapResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn bootstrap(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
) -> HttpResponse {
    log::info!("🚪 POST /session/bootstrap - user {} ({})", user.user_id, user.role.as_str());

    match migration_service::migrate_user_settings(&state.store, &state.rules, &user, state.migration_mode) {
        Ok(outcome) => {
            if outcome.created || outcome.enforced {
                metrics::increment_migrations();
            }
            HttpResponse::Ok().json(BootstrapResponse { success: true, outcome })
        }
        Err(e) => {
            log::error!("❌ Settings migration failed for {}: {}", user.user_id, e);
            metrics::increment_error_count();
            AppError::from(e).error_response()
        }
    }
}
