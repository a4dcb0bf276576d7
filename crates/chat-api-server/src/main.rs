use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use chat_api_server::config::Settings;
use chat_api_server::router::build_router;
use chat_api_server::services::LlmService;
use chat_api_server::state::AppState;
use chat_api_server::store;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,chat_api_server=debug".to_string()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("Starting Chat API Server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("Configuration loaded");

    // Store handle lives for the whole process and is closed on shutdown
    let conversation_store = store::connect(&settings).await?;
    info!("Conversation store ready");

    let llm_service = Arc::new(LlmService::new(settings.llm.clone())?);

    let addr = settings.bind_address();
    let state = AppState::new(settings, conversation_store.clone(), llm_service);
    let app = build_router(state);

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    conversation_store.close().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
