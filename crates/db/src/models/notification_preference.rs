//! Notification preference model.

use serde::Serialize;
use sqlx::FromRow;
use studybuddy_core::notification::PreferenceFlags;
use studybuddy_core::types::{DbId, Timestamp};

/// A row from the `notification_preferences` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationPreferences {
    pub id: DbId,
    pub user_id: DbId,
    pub social_enabled: bool,
    pub group_enabled: bool,
    pub invite_enabled: bool,
    pub content_enabled: bool,
    pub note_likes_enabled: bool,
    pub note_comments_enabled: bool,
    pub message_replies_enabled: bool,
    pub new_notes_enabled: bool,
    pub member_joins_enabled: bool,
    pub batch_similar: bool,
    pub batch_window_minutes: i32,
    pub quiet_hours_enabled: bool,
    pub quiet_start_hour: i32,
    pub quiet_end_hour: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NotificationPreferences {
    /// The flags consulted by filtering, batching and quiet hours.
    pub fn flags(&self) -> PreferenceFlags {
        PreferenceFlags {
            user_id: self.user_id,
            social_enabled: self.social_enabled,
            group_enabled: self.group_enabled,
            invite_enabled: self.invite_enabled,
            content_enabled: self.content_enabled,
            note_likes_enabled: self.note_likes_enabled,
            note_comments_enabled: self.note_comments_enabled,
            message_replies_enabled: self.message_replies_enabled,
            new_notes_enabled: self.new_notes_enabled,
            member_joins_enabled: self.member_joins_enabled,
            batch_similar: self.batch_similar,
            batch_window_minutes: self.batch_window_minutes,
            quiet_hours_enabled: self.quiet_hours_enabled,
            quiet_start_hour: self.quiet_start_hour,
            quiet_end_hour: self.quiet_end_hour,
        }
    }
}
