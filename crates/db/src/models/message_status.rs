//! Per-recipient message delivery status models.

use serde::Serialize;
use sqlx::FromRow;
use studybuddy_core::error::CoreError;
use studybuddy_core::message_status::DeliveryStatus;
use studybuddy_core::types::{DbId, Timestamp};

/// A row from the `message_statuses` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct MessageStatus {
    pub id: DbId,
    pub message_id: DbId,
    pub user_id: DbId,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MessageStatus {
    /// Parse the stored status text.
    pub fn delivery_status(&self) -> Result<DeliveryStatus, CoreError> {
        DeliveryStatus::from_str(&self.status)
    }
}

/// A status row returned from an upsert, flagged with whether it was newly
/// inserted (as opposed to updated in place).
#[derive(Debug, Clone, FromRow)]
pub struct UpsertedStatus {
    #[sqlx(flatten)]
    pub status: MessageStatus,
    pub inserted: bool,
}

/// A status row joined with the recipient's profile, for read receipts.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageStatusWithProfile {
    pub id: DbId,
    pub message_id: DbId,
    pub user_id: DbId,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub display_name: String,
    pub avatar_url: Option<String>,
}
