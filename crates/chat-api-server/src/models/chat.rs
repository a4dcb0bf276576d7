use axum::http::Method;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::ValidationError;

/// Owner used when the request carries no user id.
pub const ANONYMOUS_USER: &str = "anonymous";

// ===== PROMPT MODELS =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String, // "system", "user" or "assistant"
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

// ===== STORED MODELS =====

/// One user message and the reply generated for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    /// Partition key
    pub user_id: String,
    /// Sort key: decimal millisecond clock reading, increasing within a partition
    pub chat_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub assistant_message: String,
}

// ===== REQUEST MODELS =====

/// Raw JSON body as sent by the web client.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEnvelope {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

/// A validated inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    Preflight,
    Send { user_id: String, message: String },
    Reset { user_id: String },
    GetHistory { user_id: String },
}

impl ChatAction {
    /// Validate the HTTP method and body into an action.
    ///
    /// `OPTIONS` is always a preflight and only `POST` carries an envelope.
    /// An empty body is treated as `{}`, so a POST without a body fails with
    /// [`ValidationError::MissingMessage`].
    pub fn from_request(method: &Method, body: &[u8]) -> Result<Self, ValidationError> {
        if *method == Method::OPTIONS {
            return Ok(Self::Preflight);
        }
        if *method != Method::POST {
            return Err(ValidationError::UnsupportedMethod(method.to_string()));
        }

        let envelope = if body.iter().all(u8::is_ascii_whitespace) {
            ChatEnvelope::default()
        } else {
            serde_json::from_slice::<ChatEnvelope>(body)
                .map_err(|e| ValidationError::MalformedBody(e.to_string()))?
        };

        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: ChatEnvelope) -> Result<Self, ValidationError> {
        let user_id = envelope
            .user_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());

        match envelope.action.as_deref() {
            Some("reset") => Ok(Self::Reset { user_id }),
            Some("getHistory") => Ok(Self::GetHistory { user_id }),
            Some(other) => Err(ValidationError::UnknownAction(other.to_string())),
            None => match envelope.message {
                Some(message) if !message.is_empty() => Ok(Self::Send { user_id, message }),
                _ => Err(ValidationError::MissingMessage),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Preflight => "preflight",
            Self::Send { .. } => "send",
            Self::Reset { .. } => "reset",
            Self::GetHistory { .. } => "getHistory",
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Preflight => None,
            Self::Send { user_id, .. } | Self::Reset { user_id } | Self::GetHistory { user_id } => {
                Some(user_id.as_str())
            }
        }
    }
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(body: &str) -> Result<ChatAction, ValidationError> {
        ChatAction::from_request(&Method::POST, body.as_bytes())
    }

    #[test]
    fn test_options_is_preflight_regardless_of_body() {
        let action = ChatAction::from_request(&Method::OPTIONS, b"not json").unwrap();
        assert_eq!(action, ChatAction::Preflight);
        assert_eq!(action.user_id(), None);
    }

    #[test]
    fn test_message_without_action_is_send() {
        let action = post(r#"{"message":"hi","userId":"u1"}"#).unwrap();
        assert_eq!(
            action,
            ChatAction::Send { user_id: "u1".to_string(), message: "hi".to_string() }
        );
    }

    #[test]
    fn test_missing_user_id_defaults_to_anonymous() {
        let action = post(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(action.user_id(), Some(ANONYMOUS_USER));

        let action = post(r#"{"action":"getHistory","userId":""}"#).unwrap();
        assert_eq!(action, ChatAction::GetHistory { user_id: ANONYMOUS_USER.to_string() });
    }

    #[test]
    fn test_reset_and_history_actions_ignore_message() {
        assert_eq!(
            post(r#"{"action":"reset","userId":"u2"}"#).unwrap(),
            ChatAction::Reset { user_id: "u2".to_string() }
        );
        assert_eq!(
            post(r#"{"action":"getHistory","userId":"u2","message":"ignored"}"#).unwrap(),
            ChatAction::GetHistory { user_id: "u2".to_string() }
        );
    }

    #[test]
    fn test_missing_or_empty_message_is_rejected() {
        assert_eq!(post(r#"{"userId":"u1"}"#), Err(ValidationError::MissingMessage));
        assert_eq!(post(r#"{"message":""}"#), Err(ValidationError::MissingMessage));
        assert_eq!(post(""), Err(ValidationError::MissingMessage));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert_eq!(
            post(r#"{"action":"delete","message":"hi"}"#),
            Err(ValidationError::UnknownAction("delete".to_string()))
        );
    }

    #[test]
    fn test_only_post_carries_an_envelope() {
        assert_eq!(
            ChatAction::from_request(&Method::GET, br#"{"message":"hi"}"#),
            Err(ValidationError::UnsupportedMethod("GET".to_string()))
        );
        assert_eq!(
            ChatAction::from_request(&Method::DELETE, b""),
            Err(ValidationError::UnsupportedMethod("DELETE".to_string()))
        );
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        assert!(matches!(post("{not json"), Err(ValidationError::MalformedBody(_))));
        assert!(matches!(post("[1, 2]"), Err(ValidationError::MalformedBody(_))));
    }

    #[test]
    fn test_turn_serializes_with_camel_case_keys() {
        let turn = ConversationTurn {
            user_id: "u1".to_string(),
            chat_id: "1760000000000".to_string(),
            timestamp: DateTime::from_timestamp_millis(1_760_000_000_000).unwrap(),
            user_message: String::new(),
            assistant_message: "Hello".to_string(),
        };

        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["chatId"], "1760000000000");
        assert_eq!(value["userMessage"], "");
        assert_eq!(value["assistantMessage"], "Hello");
        assert!(value["timestamp"].as_str().unwrap().starts_with("2025-10-09T"));
    }
}
