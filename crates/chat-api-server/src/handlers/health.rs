use crate::config::Settings;
use crate::store::ConversationStore;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    model: String,
}

pub async fn health_check(
    State(settings): State<Arc<Settings>>,
) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model: settings.llm.model.clone(),
        }),
    )
}

pub async fn readiness_check(State(store): State<Arc<dyn ConversationStore>>) -> StatusCode {
    match store.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
