//! Conversation turn persistence
//!
//! Turns are laid out like a two-key table:
//! - partition key `user_id`, the unit of isolation and bulk deletion
//! - sort key `chat_id`, whose ordering matches creation order
//!
//! Backends implement [`ConversationStore`]. Chat traffic goes through the
//! [`ConversationHistory`] accessor built on top of it; the readiness probe
//! pings the store directly.

mod chat_id;
mod history;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::{Settings, StoreBackend};
use crate::database::{DbPool, PgConversationStore};
use crate::models::chat::ConversationTurn;

pub use chat_id::ChatIdGenerator;
pub use history::ConversationHistory;
pub use memory::InMemoryConversationStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Turn already exists: user={user_id}, chat={chat_id}")]
    Conflict { user_id: String, chat_id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Backing table for conversation turns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All turns of one partition, oldest first.
    async fn query_partition(&self, user_id: &str) -> Result<Vec<ConversationTurn>, StoreError>;

    /// Insert a new turn. Fails with [`StoreError::Conflict`] if the key exists.
    async fn put_turn(&self, turn: &ConversationTurn) -> Result<(), StoreError>;

    async fn delete_turn(&self, user_id: &str, chat_id: &str) -> Result<(), StoreError>;

    /// Delete every turn of a partition and return how many were removed.
    ///
    /// The default is the degraded path for stores without a batch primitive:
    /// query the partition, then delete turn by turn.
    async fn delete_partition(&self, user_id: &str) -> Result<usize, StoreError> {
        delete_sequentially(self, user_id).await
    }

    /// Readiness probe.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Release connections on shutdown.
    async fn close(&self) {}
}

/// Fetch a partition and delete its turns one at a time.
///
/// Stops at the first failed delete; turns removed before it stay removed.
pub async fn delete_sequentially<S>(store: &S, user_id: &str) -> Result<usize, StoreError>
where
    S: ConversationStore + ?Sized,
{
    let turns = store.query_partition(user_id).await?;
    for turn in &turns {
        store.delete_turn(&turn.user_id, &turn.chat_id).await?;
    }
    Ok(turns.len())
}

/// Build the store selected by `store.backend`.
pub async fn connect(settings: &Settings) -> anyhow::Result<Arc<dyn ConversationStore>> {
    match settings.store.backend {
        StoreBackend::Postgres => {
            let pool = DbPool::new(&settings.database).await?;
            let store = PgConversationStore::new(pool);
            store.ensure_schema().await?;
            info!("Using PostgreSQL conversation store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("Using in-memory conversation store");
            Ok(Arc::new(InMemoryConversationStore::new()))
        }
    }
}
