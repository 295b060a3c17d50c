//! Notification entity models and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use studybuddy_core::error::CoreError;
use studybuddy_core::notification::{Action, MessageBody, NotificationMetadata, Priority};
use studybuddy_core::types::{DbId, Timestamp};

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub category: String,
    pub action: String,
    pub priority: String,
    pub title: String,
    pub message: String,
    #[serde(skip)]
    pub actor_label: Option<String>,
    #[serde(skip)]
    pub message_suffix: String,
    pub metadata: serde_json::Value,
    pub action_url: Option<String>,
    pub group_key: String,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub is_archived: bool,
    pub archived_at: Option<Timestamp>,
    #[serde(skip)]
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Notification {
    pub fn priority(&self) -> Result<Priority, CoreError> {
        Priority::from_str(&self.priority)
    }

    /// The templated body this row was rendered from.
    pub fn body(&self) -> MessageBody {
        MessageBody {
            actor: self.actor_label.clone(),
            suffix: self.message_suffix.clone(),
        }
    }

    pub fn parsed_metadata(&self) -> Result<NotificationMetadata, CoreError> {
        NotificationMetadata::from_json(&self.metadata)
    }
}

/// DTO for inserting a notification row.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: DbId,
    pub action: Action,
    pub priority: Priority,
    pub title: String,
    pub body: MessageBody,
    pub metadata: NotificationMetadata,
    pub action_url: Option<String>,
    pub group_key: String,
}

/// DTO for folding a batched event into an existing row.
#[derive(Debug, Clone)]
pub struct NotificationMerge {
    pub body: MessageBody,
    /// Full replacement for the stored JSON object.
    pub metadata: serde_json::Value,
    /// New `created_at`, so the row re-sorts to the top of unread lists.
    pub bumped_at: Timestamp,
}
