use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{ConversationStore, StoreError};
use crate::models::chat::ConversationTurn;

type Partition = BTreeMap<String, ConversationTurn>;

/// Process-local store for development and tests.
/// One DashMap entry per user; turns inside a partition are kept sorted by `chat_id`.
#[derive(Clone, Default)]
pub struct InMemoryConversationStore {
    partitions: Arc<DashMap<String, Partition>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty partitions
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn query_partition(&self, user_id: &str) -> Result<Vec<ConversationTurn>, StoreError> {
        let turns: Vec<ConversationTurn> = self
            .partitions
            .get(user_id)
            .map(|partition| partition.values().cloned().collect())
            .unwrap_or_default();
        Ok(turns)
    }

    async fn put_turn(&self, turn: &ConversationTurn) -> Result<(), StoreError> {
        let mut partition = self.partitions.entry(turn.user_id.clone()).or_default();
        if partition.contains_key(&turn.chat_id) {
            return Err(StoreError::Conflict {
                user_id: turn.user_id.clone(),
                chat_id: turn.chat_id.clone(),
            });
        }
        partition.insert(turn.chat_id.clone(), turn.clone());
        debug!("Stored turn {} for user {} in memory", turn.chat_id, turn.user_id);
        Ok(())
    }

    async fn delete_turn(&self, user_id: &str, chat_id: &str) -> Result<(), StoreError> {
        if let Some(mut partition) = self.partitions.get_mut(user_id) {
            partition.remove(chat_id);
        }
        self.partitions.remove_if(user_id, |_, partition| partition.is_empty());
        Ok(())
    }

    async fn delete_partition(&self, user_id: &str) -> Result<usize, StoreError> {
        let removed = self
            .partitions
            .remove(user_id)
            .map(|(_, partition)| partition.len())
            .unwrap_or(0);
        debug!("Removed {} turns for user {} from memory", removed, user_id);
        Ok(removed)
    }
}
