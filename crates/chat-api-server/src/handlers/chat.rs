use crate::models::chat::{ChatAction, HistoryResponse, MessageResponse, ResetResponse};
use crate::services::{ChatReply, ChatService};
use crate::utils::cors;
use crate::utils::error::{ChatError, ValidationError};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Single entry point for preflight, send, reset and getHistory.
pub async fn chat_handler(
    State(chat_service): State<Arc<ChatService>>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Result<ChatReply, ChatError> {
    let body = body.map_err(|rejection| ValidationError::MalformedBody(rejection.body_text()))?;
    debug!("Chat request: method={}, body_len={}", method, body.len());

    let action = ChatAction::from_request(&method, &body)?;

    info!(
        "Chat request: action={}, user={}",
        action.name(),
        action.user_id().unwrap_or("-")
    );

    chat_service.handle(action).await
}

impl IntoResponse for ChatReply {
    fn into_response(self) -> Response {
        match self {
            ChatReply::Preflight => (StatusCode::OK, cors::preflight()).into_response(),
            ChatReply::Reset { success, message } => (
                StatusCode::OK,
                cors::allow_origin(),
                Json(ResetResponse { success, message }),
            )
                .into_response(),
            ChatReply::History(history) => (
                StatusCode::OK,
                cors::allow_origin(),
                Json(HistoryResponse { history }),
            )
                .into_response(),
            ChatReply::Message(message) => (
                StatusCode::OK,
                cors::allow_origin(),
                Json(MessageResponse { message }),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN};

    #[tokio::test]
    async fn test_preflight_has_empty_body_and_cors_headers() {
        let response = ChatReply::Preflight.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], cors::ALLOW_ORIGIN);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS], cors::ALLOW_METHODS);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_message_reply_envelope() {
        let response = ChatReply::Message("hello".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "message": "hello" }));
    }

    #[tokio::test]
    async fn test_reset_reply_envelope() {
        let response = ChatReply::Reset { success: false, message: "nope".to_string() }
            .into_response();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "success": false, "message": "nope" }));
    }
}
