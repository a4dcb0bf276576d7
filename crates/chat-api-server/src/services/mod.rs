pub mod chat_service;
pub mod llm_service;

pub use chat_service::{ChatReply, ChatService};
pub use llm_service::{CompletionError, CompletionProvider, LlmService};
