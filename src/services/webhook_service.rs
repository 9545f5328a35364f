// ==================== N8N WEBHOOK CLIENT ====================
// Envia mensagens de chat ao webhook ativo e normaliza a resposta.
// Cada falha vira um erro distinto e legível; nada de dados malformados.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::models::{ChatAnswer, N8nConfig, WebhookPayload};

/// Marker the n8n layer embeds in its own error replies
pub const NO_RESPONSE_MARKER: &str = "no response from webhook";

pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("No active webhook is configured for this user")]
    ConfigurationMissing,
    #[error("Could not reach the chat webhook: {0}")]
    Network(String),
    #[error("The chat webhook did not answer within {0:?}")]
    Timeout(Duration),
    #[error("The chat webhook returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("The chat webhook returned an empty response")]
    EmptyResponse,
    #[error("The chat webhook returned invalid JSON: {0}")]
    InvalidJson(String),
    #[error("The chat webhook response has an unexpected shape: {0}")]
    UnexpectedShape(String),
    #[error("The chat webhook reported an error: {0}")]
    WebhookReported(String),
}

impl WebhookError {
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookError::ConfigurationMissing => "configuration_missing",
            WebhookError::Network(_) => "webhook_network",
            WebhookError::Timeout(_) => "webhook_timeout",
            WebhookError::HttpStatus { .. } => "webhook_http_status",
            WebhookError::EmptyResponse => "webhook_empty_response",
            WebhookError::InvalidJson(_) => "webhook_invalid_json",
            WebhookError::UnexpectedShape(_) => "webhook_unexpected_shape",
            WebhookError::WebhookReported(_) => "webhook_reported_error",
        }
    }
}

#[derive(Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl WebhookClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// Envia `sendMessage` ao webhook da config ativa
    pub async fn send_message(
        &self,
        config: &N8nConfig,
        payload: &WebhookPayload,
    ) -> Result<ChatAnswer, WebhookError> {
        let url = config.webhook_url.trim();
        if url.is_empty() {
            return Err(WebhookError::ConfigurationMissing);
        }

        log::info!(
            "💬 Sending message to webhook '{}' (session {}, user {})",
            config.name,
            payload.session_id,
            payload.user_id
        );

        // The request timeout covers the body read too; when it fires the
        // in-flight request is dropped.
        let response = self
            .http
            .post(url)
            .header("Accept", "application/json")
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        // The n8n layer reports its own failures in-band, whatever the status
        if body.to_lowercase().contains(NO_RESPONSE_MARKER) {
            log::warn!("⚠️  Webhook reported an error (HTTP {})", status);
            return Err(WebhookError::WebhookReported(truncate(body.trim(), 200)));
        }

        if !status.is_success() {
            log::warn!("⚠️  Webhook returned {}", status);
            return Err(WebhookError::HttpStatus {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let answer = parse_webhook_body(&body)?;
        log::info!("✅ Webhook answered ({} chars)", answer.answer.len());
        Ok(answer)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> WebhookError {
        if e.is_timeout() {
            log::error!("⏱️  Webhook timed out after {:?}", self.timeout);
            WebhookError::Timeout(self.timeout)
        } else {
            log::error!("❌ Webhook request failed: {}", e);
            WebhookError::Network(e.to_string())
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Normaliza o corpo: objeto puro ou array envolvendo o objeto.
pub fn parse_webhook_body(body: &str) -> Result<ChatAnswer, WebhookError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(WebhookError::EmptyResponse);
    }

    // In-band marker wins over any parse outcome
    if trimmed.to_lowercase().contains(NO_RESPONSE_MARKER) {
        return Err(WebhookError::WebhookReported(truncate(trimmed, 200)));
    }

    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| WebhookError::InvalidJson(e.to_string()))?;

    let object = match value {
        Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| WebhookError::UnexpectedShape("empty array".to_string()))?,
        Value::Null => return Err(WebhookError::EmptyResponse),
        other => other,
    };

    if !object.is_object() {
        return Err(WebhookError::UnexpectedShape(format!(
            "expected an object, got {}",
            json_type(&object)
        )));
    }

    let answer: ChatAnswer = serde_json::from_value(object)
        .map_err(|e| WebhookError::UnexpectedShape(e.to_string()))?;

    if answer.answer.trim().is_empty() {
        return Err(WebhookError::EmptyResponse);
    }

    Ok(answer)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
