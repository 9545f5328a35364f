use actix_web::{web, HttpResponse, ResponseError};

use crate::{
    api::metrics,
    models::{ChatMessageRequest, ChatMessageResponse, SessionIdentity, WebhookPayload},
    services::settings_service,
    state::AppState,
    utils::error::AppError,
};

/// POST /api/v1/chat/messages - Envia a mensagem ao webhook n8n ativo do usuário
#[utoipa::path(
    post,
    path = "/api/v1/chat/messages",
    tag = "Chat",
    request_body = ChatMessageRequest,
    responses(
        (status = 200, description = "Answer from the active webhook", body = ChatMessageResponse),
        (status = 400, description = "Empty message"),
        (status = 502, description = "Webhook failed or answered with an error"),
        (status = 504, description = "Webhook timed out")
    ),
    security(("bearer_auth" = []))
)]
pub async fn send_message(
    user: web::ReqData<SessionIdentity>,
    state: web::Data<AppState>,
    request: web::Json<ChatMessageRequest>,
) -> HttpResponse {
    let request = request.into_inner();
    if request.chat_input.trim().is_empty() {
        metrics::increment_error_count();
        return AppError::InvalidRequest("chatInput cannot be empty".to_string()).error_response();
    }

    let config = settings_service::get_user_active_n8n_config(&state.store, &state.rules, &user);
    let payload = WebhookPayload::send_message(&user.user_id, request);

    log::info!(
        "💬 POST /chat/messages - user {} via '{}' (session {})",
        user.user_id,
        config.name,
        payload.session_id
    );

    let result = state.webhook.send_message(&config, &payload).await;
    metrics::record_webhook_call(result.is_ok());

    match result {
        Ok(answer) => HttpResponse::Ok().json(ChatMessageResponse {
            success: true,
            session_id: payload.session_id,
            chat_id: payload.chat_id,
            answer,
        }),
        Err(e) => {
            log::error!("❌ Chat message failed for {}: {}", user.user_id, e);
            metrics::increment_error_count();
            AppError::from(e).error_response()
        }
    }
}
