use serde::{Deserialize, Serialize};

pub const SEND_MESSAGE_ACTION: &str = "sendMessage";

/// Request body accepted by `POST /api/v1/chat/messages`
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRequest {
    pub chat_input: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

/// Payload enviado ao webhook n8n
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub session_id: String,
    pub chat_id: String,
    pub user_id: String,
    pub action: String,
    pub chat_input: String,
}

impl WebhookPayload {
    /// Builds a `sendMessage` payload. A missing session id gets a fresh UUID and
    /// the chat id defaults to the session id.
    pub fn send_message(user_id: &str, request: ChatMessageRequest) -> Self {
        let session_id = request
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let chat_id = request
            .chat_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| session_id.clone());

        Self {
            session_id,
            chat_id,
            user_id: user_id.to_string(),
            action: SEND_MESSAGE_ACTION.to_string(),
            chat_input: request.chat_input,
        }
    }
}

/// Resposta normalizada do webhook
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnswer {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_content: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageResponse {
    pub success: bool,
    pub session_id: String,
    pub chat_id: String,
    #[serde(flatten)]
    pub answer: ChatAnswer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_defaults_chat_id_to_session_id() {
        let payload = WebhookPayload::send_message(
            "u1",
            ChatMessageRequest {
                chat_input: "hello".into(),
                session_id: Some("s-1".into()),
                chat_id: None,
            },
        );
        assert_eq!(payload.chat_id, "s-1");
        assert_eq!(payload.action, "sendMessage");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["sessionId"], "s-1");
        assert_eq!(json["chatInput"], "hello");
        assert_eq!(json["userId"], "u1");
    }

    #[test]
    fn test_payload_generates_session_id() {
        let payload = WebhookPayload::send_message(
            "u1",
            ChatMessageRequest {
                chat_input: "hi".into(),
                session_id: Some("  ".into()),
                chat_id: None,
            },
        );
        assert!(uuid::Uuid::parse_str(&payload.session_id).is_ok());
        assert_eq!(payload.chat_id, payload.session_id);
    }
}
