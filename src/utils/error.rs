use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::services::prompt_service::PromptError;
use crate::services::webhook_service::WebhookError;

/// Falhas de escrita no key-value store (leituras nunca falham)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage lock poisoned")]
    Poisoned,
    #[error("Refusing to overwrite unreadable blob under '{0}'")]
    Unreadable(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Webhook(#[from] WebhookError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Stable machine-readable tag rendered next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Store(_) => "storage",
            AppError::Webhook(e) => e.kind(),
            AppError::Prompt(e) => e.kind(),
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::NotFound(_) => "not_found",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Webhook(WebhookError::ConfigurationMissing) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Webhook(WebhookError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Webhook(_) => StatusCode::BAD_GATEWAY,
            AppError::Prompt(PromptError::NotConfigured) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Prompt(PromptError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Prompt(_) => StatusCode::BAD_GATEWAY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "kind": self.kind(),
        }))
    }
}
