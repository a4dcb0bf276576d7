use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::PromptsConfig;
use crate::models::chat::{ChatAction, ChatMessage, ConversationTurn};
use crate::services::llm_service::CompletionProvider;
use crate::store::ConversationHistory;
use crate::utils::error::ChatError;

pub const RESET_SUCCESS_MESSAGE: &str = "Conversation history cleared";
pub const RESET_FAILURE_MESSAGE: &str = "Failed to clear conversation history";

/// Outcome of one handled request, rendered by the chat handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    Preflight,
    Reset { success: bool, message: String },
    History(Vec<ConversationTurn>),
    Message(String),
}

/// Request orchestration: history lookup, prompt assembly, completion and persistence.
pub struct ChatService {
    history: ConversationHistory,
    llm: Arc<dyn CompletionProvider>,
    prompts: PromptsConfig,
}

impl ChatService {
    pub fn new(
        history: ConversationHistory,
        llm: Arc<dyn CompletionProvider>,
        prompts: PromptsConfig,
    ) -> Self {
        Self { history, llm, prompts }
    }

    #[cfg(test)]
    fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub async fn handle(&self, action: ChatAction) -> Result<ChatReply, ChatError> {
        match action {
            ChatAction::Preflight => Ok(ChatReply::Preflight),
            ChatAction::Reset { user_id } => Ok(self.reset(&user_id).await),
            ChatAction::GetHistory { user_id } => self.get_history(&user_id).await,
            ChatAction::Send { user_id, message } => self.send(&user_id, &message).await,
        }
    }

    async fn reset(&self, user_id: &str) -> ChatReply {
        let success = self.history.clear_history(user_id).await;
        let message = if success { RESET_SUCCESS_MESSAGE } else { RESET_FAILURE_MESSAGE };

        ChatReply::Reset { success, message: message.to_string() }
    }

    /// Stored turns, or a freshly persisted welcome turn for a new conversation.
    async fn get_history(&self, user_id: &str) -> Result<ChatReply, ChatError> {
        let turns = self.history.fetch_history(user_id).await;
        if !turns.is_empty() {
            return Ok(ChatReply::History(turns));
        }

        info!("No history for user {}, creating welcome turn", user_id);
        let welcome = self
            .history
            .append_turn(user_id, "", &self.prompts.welcome_message)
            .await?;

        Ok(ChatReply::History(vec![welcome]))
    }

    async fn send(&self, user_id: &str, message: &str) -> Result<ChatReply, ChatError> {
        let start = Instant::now();

        let prior = self.history.fetch_history(user_id).await;
        let prompt = self.build_prompt(&prior, message);
        debug!(
            "Prompt for user {}: {} prior turns, {} messages",
            user_id,
            prior.len(),
            prompt.len()
        );

        let reply = match self.llm.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Completion failed for user {}: {}", user_id, e);
                self.prompts.apology_message.clone()
            }
        };

        self.history.append_turn(user_id, message, &reply).await?;

        info!(
            "Replied to user {} in {}ms ({} chars)",
            user_id,
            start.elapsed().as_millis(),
            reply.len()
        );

        Ok(ChatReply::Message(reply))
    }

    /// System instruction, then every prior turn as a user/assistant pair
    /// (oldest first), then the new message.
    pub fn build_prompt(&self, prior: &[ConversationTurn], message: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(prior.len() * 2 + 2);
        messages.push(ChatMessage::system(self.prompts.system_prompt.as_str()));

        for turn in prior {
            messages.push(ChatMessage::user(turn.user_message.as_str()));
            messages.push(ChatMessage::assistant(turn.assistant_message.as_str()));
        }

        messages.push(ChatMessage::user(message));
        messages
    }
}
