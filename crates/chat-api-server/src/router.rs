use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Router,
};
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::handlers;
use crate::state::AppState;

/// Chat bodies are a few kilobytes at most.
const MAX_BODY_BYTES: usize = 256 * 1024;

pub fn build_router(state: AppState) -> Router {
    let chat_routes = Router::new()
        // Every method reaches the handler so rejections keep the CORS envelope
        .route("/chat", any(handlers::chat::chat_handler))
        // Gateways proxying the root path
        .route("/", any(handlers::chat::chat_handler));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .merge(chat_routes)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
