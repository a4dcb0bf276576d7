use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use tracing::{debug, error, info, warn};

use super::{ChatIdGenerator, ConversationStore, StoreError};
use crate::models::chat::ConversationTurn;

/// Reads and writes the turns of one user at a time.
#[derive(Clone)]
pub struct ConversationHistory {
    store: Arc<dyn ConversationStore>,
    chat_ids: Arc<ChatIdGenerator>,
}

impl ConversationHistory {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            store,
            chat_ids: Arc::new(ChatIdGenerator::new()),
        }
    }

    /// All turns of `user_id`, oldest first.
    /// A failed read is logged and reported as an empty history.
    pub async fn fetch_history(&self, user_id: &str) -> Vec<ConversationTurn> {
        match self.store.query_partition(user_id).await {
            Ok(turns) => {
                debug!("Fetched {} turns for user {}", turns.len(), user_id);
                turns
            }
            Err(e) => {
                warn!("Failed to fetch history for user {}: {}", user_id, e);
                Vec::new()
            }
        }
    }

    /// Create, persist and return a new turn. Write failures propagate.
    pub async fn append_turn(
        &self,
        user_id: &str,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<ConversationTurn, StoreError> {
        let turn = ConversationTurn {
            user_id: user_id.to_string(),
            chat_id: self.chat_ids.next_id().to_string(),
            timestamp: Utc::now().trunc_subsecs(3),
            user_message: user_message.to_string(),
            assistant_message: assistant_message.to_string(),
        };

        self.store.put_turn(&turn).await?;
        debug!("Appended turn {} for user {}", turn.chat_id, user_id);

        Ok(turn)
    }

    /// Delete every turn of `user_id`. Returns `false` if any step failed.
    pub async fn clear_history(&self, user_id: &str) -> bool {
        match self.store.delete_partition(user_id).await {
            Ok(removed) => {
                info!("Cleared {} turns for user {}", removed, user_id);
                true
            }
            Err(e) => {
                error!("Failed to clear history for user {}: {}", user_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryConversationStore, MockConversationStore};

    fn memory_history() -> ConversationHistory {
        ConversationHistory::new(Arc::new(InMemoryConversationStore::new()))
    }

    #[tokio::test]
    async fn test_fetch_without_appends_is_empty() {
        let history = memory_history();
        assert!(history.fetch_history("u1").await.is_empty());
        assert!(history.fetch_history("anonymous").await.is_empty());
    }

    #[tokio::test]
    async fn test_appends_come_back_in_order() {
        let history = memory_history();
        let mut written = Vec::new();
        for i in 0..5 {
            written.push(
                history
                    .append_turn("u1", &format!("q{}", i), &format!("a{}", i))
                    .await
                    .unwrap(),
            );
        }

        let fetched = history.fetch_history("u1").await;
        assert_eq!(fetched, written);
        assert!(fetched.windows(2).all(|w| {
            w[0].chat_id.parse::<i64>().unwrap() < w[1].chat_id.parse::<i64>().unwrap()
        }));
    }

    #[tokio::test]
    async fn test_append_returns_the_written_record() {
        let history = memory_history();
        let turn = history.append_turn("u1", "", "Welcome").await.unwrap();

        assert_eq!(turn.user_id, "u1");
        assert_eq!(turn.user_message, "");
        assert_eq!(turn.assistant_message, "Welcome");
        assert!(turn.chat_id.parse::<i64>().is_ok());
        assert_eq!(turn.timestamp.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[tokio::test]
    async fn test_clear_then_fetch_is_empty() {
        let history = memory_history();
        history.append_turn("u1", "q", "a").await.unwrap();
        history.append_turn("u2", "q", "a").await.unwrap();

        assert!(history.clear_history("u1").await);
        assert!(history.fetch_history("u1").await.is_empty());
        assert_eq!(history.fetch_history("u2").await.len(), 1);
    }

    #[tokio::test]
    async fn test_read_failure_is_absorbed() {
        let mut store = MockConversationStore::new();
        store
            .expect_query_partition()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("timeout".to_string())));

        let history = ConversationHistory::new(Arc::new(store));
        assert!(history.fetch_history("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let mut store = MockConversationStore::new();
        store
            .expect_put_turn()
            .times(1)
            .returning(|_| Err(StoreError::Database("disk full".to_string())));

        let history = ConversationHistory::new(Arc::new(store));
        let err = history.append_turn("u1", "q", "a").await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn test_clear_failure_returns_false() {
        let mut store = MockConversationStore::new();
        store
            .expect_delete_partition()
            .times(1)
            .returning(|_| Err(StoreError::Database("lock timeout".to_string())));

        let history = ConversationHistory::new(Arc::new(store));
        assert!(!history.clear_history("u1").await);
    }
}
