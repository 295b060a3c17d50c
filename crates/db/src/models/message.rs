//! Group chat message models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studybuddy_core::types::{DbId, Timestamp};

/// A row from the `messages` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub group_id: DbId,
    pub sender_id: DbId,
    pub content: String,
    pub reply_to_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for persisting a new message.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMessage {
    pub group_id: DbId,
    pub sender_id: DbId,
    pub content: String,
    pub reply_to_id: Option<DbId>,
}
