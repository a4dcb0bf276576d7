use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::chat::ErrorResponse;
use crate::store::StoreError;
use crate::utils::cors;

/// User-facing text of every 500 envelope.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "Sorry, something went wrong while processing your request.";

/// Rejected request shapes, detected before any store or completion call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message is required")]
    MissingMessage,

    #[error("Unsupported action: {0}")]
    UnknownAction(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChatError {
    fn kind(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "validation",
            ChatError::Store(_) => "store",
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        match &self {
            ChatError::Validation(e) => {
                tracing::warn!(kind = self.kind(), "Rejected request: {}", e)
            }
            ChatError::Store(e) => tracing::error!(kind = self.kind(), "Store error: {}", e),
        }

        let body = Json(ErrorResponse {
            message: INTERNAL_ERROR_MESSAGE.to_string(),
            error: self.to_string(),
        });

        (StatusCode::INTERNAL_SERVER_ERROR, cors::allow_origin(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;

    #[tokio::test]
    async fn test_validation_error_renders_500_envelope() {
        let response = ChatError::from(ValidationError::MissingMessage).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.message, INTERNAL_ERROR_MESSAGE);
        assert_eq!(body.error, "Message is required");
    }

    #[tokio::test]
    async fn test_store_error_keeps_raw_text() {
        let error = ChatError::from(StoreError::Database("connection reset".to_string()));
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "Database error: connection reset");
    }
}
