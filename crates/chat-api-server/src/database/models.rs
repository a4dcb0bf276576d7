use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::models::chat::ConversationTurn;

/// Row of `conversation_turns`.
#[derive(Debug, Clone, FromRow)]
pub struct TurnRow {
    pub user_id: String,
    pub chat_id: String,
    pub created_at: DateTime<Utc>,
    pub user_message: String,
    pub assistant_message: String,
}

impl From<TurnRow> for ConversationTurn {
    fn from(row: TurnRow) -> Self {
        Self {
            user_id: row.user_id,
            chat_id: row.chat_id,
            timestamp: row.created_at,
            user_message: row.user_message,
            assistant_message: row.assistant_message,
        }
    }
}
