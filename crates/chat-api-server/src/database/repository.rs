use async_trait::async_trait;
use tracing::{debug, info};

use super::{DbPool, TurnRow};
use crate::models::chat::ConversationTurn;
use crate::store::{ConversationStore, StoreError};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS conversation_turns (
    user_id           TEXT        NOT NULL,
    chat_id           TEXT        NOT NULL,
    created_at        TIMESTAMPTZ NOT NULL,
    user_message      TEXT        NOT NULL,
    assistant_message TEXT        NOT NULL,
    PRIMARY KEY (user_id, chat_id)
)"#;

/// Conversation turns in PostgreSQL, keyed `(user_id, chat_id)`.
pub struct PgConversationStore {
    pool: DbPool,
}

impl PgConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create the turns table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(self.pool.get_pool())
            .await
            .map_err(map_sqlx_error)?;
        info!("conversation_turns table ready");
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn query_partition(&self, user_id: &str) -> Result<Vec<ConversationTurn>, StoreError> {
        let rows = sqlx::query_as::<_, TurnRow>(
            r#"SELECT
                user_id,
                chat_id,
                created_at,
                user_message,
                assistant_message
               FROM conversation_turns
               WHERE user_id = $1
               ORDER BY chat_id COLLATE "C" ASC"#,
        )
        .bind(user_id)
        .fetch_all(self.pool.get_pool())
        .await
        .map_err(map_sqlx_error)?;

        debug!("Loaded {} turns for user {}", rows.len(), user_id);

        Ok(rows.into_iter().map(ConversationTurn::from).collect())
    }

    async fn put_turn(&self, turn: &ConversationTurn) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO conversation_turns
                (user_id, chat_id, created_at, user_message, assistant_message)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&turn.user_id)
        .bind(&turn.chat_id)
        .bind(turn.timestamp)
        .bind(&turn.user_message)
        .bind(&turn.assistant_message)
        .execute(self.pool.get_pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Conflict {
                user_id: turn.user_id.clone(),
                chat_id: turn.chat_id.clone(),
            },
            other => map_sqlx_error(other),
        })?;

        Ok(())
    }

    async fn delete_turn(&self, user_id: &str, chat_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM conversation_turns WHERE user_id = $1 AND chat_id = $2")
            .bind(user_id)
            .bind(chat_id)
            .execute(self.pool.get_pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_partition(&self, user_id: &str) -> Result<usize, StoreError> {
        let result = sqlx::query("DELETE FROM conversation_turns WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool.get_pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() as usize)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.get_pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Database(other.to_string()),
    }
}
