use actix_web::{web, HttpResponse, ResponseError};

use crate::{
    api::metrics,
    models::{
        SaveN8nConfigsRequest, SaveSupabaseConfigRequest, SessionIdentity,
        SetActiveN8nConfigRequest, SupabaseConfig, UniversalOverrides, UserSettings,
        UserSettingsUpdate,
    },
    services::settings_service::{self, ActiveConfiguration},
    state::AppState,
    utils::error::AppError,
};

fn settings_response(result: Result<UserSettings, AppError>, action: &str, user_id: &str) -> HttpResponse {
    match result {
        Ok(settings) => {
            log::info!("✅ {} for user {}", action, user_id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "settings": settings,
            }))
        }
        Err(e) => {
            log::warn!("⚠️ {} failed for user {}: {}", action, user_id, e);
            metrics::increment_error_count();
            e.error_response()
        }
    }
}

/// GET /api/v1/settings - Registro do usuário (ou padrão, sem gravar) + configuração ativa
#[utoipa::path(
    get,
    path = "/api/v1/settings",
    tag = "Settings",
    responses((status = 200, description = "Stored settings and the resolved configuration")),
    security(("bearer_auth" = []))
)]
pub async fn get_settings(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
) -> HttpResponse {
    log::info!("⚙️  GET /settings - user {}", user.user_id);

    let stored = state.store.get_user(&user.user_id);
    let persisted = stored.is_some();
    let settings = stored.unwrap_or_else(|| settings_service::get_user_settings(&state.store, &state.rules, &user));
    let active = settings_service::get_active_configuration(&state.store, &state.rules, &user);

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "persisted": persisted,
        "settings": settings,
        "active": active,
    }))
}

/// PATCH /api/v1/settings - Merge parcial de apiConfigs / uiCustomization
#[utoipa::path(
    patch,
    path = "/api/v1/settings",
    tag = "Settings",
    request_body = UserSettingsUpdate,
    responses((status = 200, description = "Updated settings record", body = UserSettings)),
    security(("bearer_auth" = []))
)]
pub async fn update_settings(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
    request: web::Json<UserSettingsUpdate>,
) -> HttpResponse {
    log::info!("🔧 PATCH /settings - user {}", user.user_id);

    let result = settings_service::save_user_settings(&state.store, &state.rules, &user, request.into_inner());
    settings_response(result, "Settings updated", &user.user_id)
}

/// GET /api/v1/settings/active - Configuração efetivamente em vigor
#[utoipa::path(
    get,
    path = "/api/v1/settings/active",
    tag = "Settings",
    responses((status = 200, description = "Resolved configuration", body = ActiveConfiguration)),
    security(("bearer_auth" = []))
)]
pub async fn get_active(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let active = settings_service::get_active_configuration(&state.store, &state.rules, &user);
    log::debug!(
        "🔎 Active config for {}: webhook '{}' ({:?}), database {:?}",
        user.user_id,
        active.active_n8n_config.name,
        active.n8n_source,
        active.supabase_source
    );
    HttpResponse::Ok().json(active)
}

/// PUT /api/v1/settings/n8n - Substitui a lista de webhooks
#[utoipa::path(
    put,
    path = "/api/v1/settings/n8n",
    tag = "Settings",
    request_body = SaveN8nConfigsRequest,
    responses(
        (status = 200, description = "Webhook list replaced", body = UserSettings),
        (status = 400, description = "Empty list, duplicate id or invalid URL"),
        (status = 403, description = "Universal write without admin role")
    ),
    security(("bearer_auth" = []))
)]
pub async fn save_n8n_configs(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
    request: web::Json<SaveN8nConfigsRequest>,
) -> HttpResponse {
    let request = request.into_inner();
    log::info!(
        "🔧 PUT /settings/n8n - user {} ({} configs, universal: {})",
        user.user_id,
        request.configs.len(),
        request.universal
    );

    let result = settings_service::save_user_n8n_configs(
        &state.store,
        &state.rules,
        &user,
        request.configs,
        request.active_config_id,
        request.universal,
    );
    settings_response(result, "Webhook configs saved", &user.user_id)
}

/// POST /api/v1/settings/n8n/active - Troca o webhook ativo
#[utoipa::path(
    post,
    path = "/api/v1/settings/n8n/active",
    tag = "Settings",
    request_body = SetActiveN8nConfigRequest,
    responses(
        (status = 200, description = "Active webhook changed", body = UserSettings),
        (status = 404, description = "Unknown config id")
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_active_n8n(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
    request: web::Json<SetActiveN8nConfigRequest>,
) -> HttpResponse {
    log::info!("🔀 POST /settings/n8n/active - user {} -> {}", user.user_id, request.config_id);

    let result = settings_service::set_active_n8n_config(&state.store, &state.rules, &user, &request.config_id);
    settings_response(result, "Active webhook changed", &user.user_id)
}

/// PUT /api/v1/settings/supabase - Atualiza URL/anon key do banco
#[utoipa::path(
    put,
    path = "/api/v1/settings/supabase",
    tag = "Settings",
    request_body = SaveSupabaseConfigRequest,
    responses(
        (status = 200, description = "Database config saved", body = UserSettings),
        (status = 403, description = "Universal write without admin role")
    ),
    security(("bearer_auth" = []))
)]
pub async fn save_supabase(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
    request: web::Json<SaveSupabaseConfigRequest>,
) -> HttpResponse {
    let request = request.into_inner();
    log::info!("🔧 PUT /settings/supabase - user {} (universal: {})", user.user_id, request.universal);

    let result = settings_service::save_user_supabase_config(
        &state.store,
        &state.rules,
        &user,
        SupabaseConfig::new(request.url, request.anon_key),
        request.universal,
    );
    settings_response(result, "Database config saved", &user.user_id)
}

fn admin_only(user: &SessionIdentity) -> Result<(), HttpResponse> {
    if user.role.is_admin() {
        Ok(())
    } else {
        metrics::increment_error_count();
        Err(AppError::Forbidden("Admin role required".to_string()).error_response())
    }
}

/// GET /api/v1/settings/universal - Overrides organizacionais (admin)
#[utoipa::path(
    get,
    path = "/api/v1/settings/universal",
    tag = "Settings",
    responses(
        (status = 200, description = "Current organization overrides"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_universal(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
) -> HttpResponse {
    if let Err(resp) = admin_only(&user) {
        return resp;
    }

    let overrides = settings_service::get_universal_overrides(&state.store);
    if overrides.is_empty() {
        log::debug!("ℹ️  No universal overrides set");
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "overrides": overrides,
    }))
}

/// PUT /api/v1/settings/universal - Grava os overrides (vale para todos os usuários)
#[utoipa::path(
    put,
    path = "/api/v1/settings/universal",
    tag = "Settings",
    request_body = UniversalOverrides,
    responses(
        (status = 200, description = "Overrides saved"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn save_universal(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
    request: web::Json<UniversalOverrides>,
) -> HttpResponse {
    log::info!("🌐 PUT /settings/universal - user {}", user.user_id);

    match settings_service::save_universal_overrides(&state.store, &user, request.into_inner()) {
        Ok(overrides) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "overrides": overrides,
        })),
        Err(e) => {
            log::warn!("⚠️ Universal overrides rejected for {}: {}", user.user_id, e);
            metrics::increment_error_count();
            e.error_response()
        }
    }
}

/// DELETE /api/v1/settings/universal - Remove os overrides
#[utoipa::path(
    delete,
    path = "/api/v1/settings/universal",
    tag = "Settings",
    responses((status = 200, description = "Overrides removed")),
    security(("bearer_auth" = []))
)]
pub async fn clear_universal(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
) -> HttpResponse {
    log::info!("🧹 DELETE /settings/universal - user {}", user.user_id);

    match settings_service::clear_universal_overrides(&state.store, &user) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => {
            metrics::increment_error_count();
            e.error_response()
        }
    }
}
