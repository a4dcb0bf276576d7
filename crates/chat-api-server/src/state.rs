use std::sync::Arc;
use axum::extract::FromRef;

use crate::config::Settings;
use crate::services::{ChatService, CompletionProvider};
use crate::store::{ConversationHistory, ConversationStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn ConversationStore>,
    pub chat_service: Arc<ChatService>,
}

impl AppState {
    /// Wire the chat service around an already connected store.
    pub fn new(
        settings: Settings,
        store: Arc<dyn ConversationStore>,
        llm: Arc<dyn CompletionProvider>,
    ) -> Self {
        let history = ConversationHistory::new(store.clone());
        let chat_service = Arc::new(ChatService::new(history, llm, settings.prompts.clone()));

        Self {
            settings: Arc::new(settings),
            store,
            chat_service,
        }
    }
}

impl FromRef<AppState> for Arc<Settings> {
    fn from_ref(state: &AppState) -> Self {
        state.settings.clone()
    }
}

impl FromRef<AppState> for Arc<ChatService> {
    fn from_ref(state: &AppState) -> Self {
        state.chat_service.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ConversationStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}
