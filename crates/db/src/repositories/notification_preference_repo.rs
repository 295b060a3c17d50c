//! Repository for the `notification_preferences` table.

use sqlx::PgPool;
use studybuddy_core::notification::UpdatePreferences;
use studybuddy_core::types::DbId;

use crate::models::notification_preference::NotificationPreferences;

/// Column list for `notification_preferences` queries.
const COLUMNS: &str = "id, user_id, social_enabled, group_enabled, invite_enabled, \
    content_enabled, note_likes_enabled, note_comments_enabled, message_replies_enabled, \
    new_notes_enabled, member_joins_enabled, batch_similar, batch_window_minutes, \
    quiet_hours_enabled, quiet_start_hour, quiet_end_hour, created_at, updated_at";

/// Provides preference lookups and updates.
pub struct NotificationPreferenceRepo;

impl NotificationPreferenceRepo {
    /// Get a user's preference row without creating one.
    pub async fn find_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<NotificationPreferences>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_preferences WHERE user_id = $1");
        sqlx::query_as::<_, NotificationPreferences>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Get a user's preference row, creating it with defaults on first access.
    pub async fn get_or_create(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<NotificationPreferences, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_preferences (user_id) \
             VALUES ($1) \
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationPreferences>(&query)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Load the preference rows that exist for a set of users.
    ///
    /// Users without a row are simply absent from the result.
    pub async fn list_for_users(
        pool: &PgPool,
        user_ids: &[DbId],
    ) -> Result<Vec<NotificationPreferences>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_preferences \
             WHERE user_id = ANY($1) \
             ORDER BY user_id"
        );
        sqlx::query_as::<_, NotificationPreferences>(&query)
            .bind(user_ids)
            .fetch_all(pool)
            .await
    }

    /// Insert or update a user's preferences.
    ///
    /// Uses `COALESCE` to only overwrite fields that are `Some` in the input;
    /// a missing row is created with defaults for the remaining fields.
    pub async fn update(
        pool: &PgPool,
        user_id: DbId,
        input: &UpdatePreferences,
    ) -> Result<NotificationPreferences, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_preferences AS p ( \
                user_id, social_enabled, group_enabled, invite_enabled, content_enabled, \
                note_likes_enabled, note_comments_enabled, message_replies_enabled, \
                new_notes_enabled, member_joins_enabled, batch_similar, batch_window_minutes, \
                quiet_hours_enabled, quiet_start_hour, quiet_end_hour) \
             VALUES ($1, COALESCE($2, true), COALESCE($3, true), COALESCE($4, true), \
                COALESCE($5, true), COALESCE($6, true), COALESCE($7, true), COALESCE($8, true), \
                COALESCE($9, false), COALESCE($10, false), COALESCE($11, true), \
                COALESCE($12, 30), COALESCE($13, false), COALESCE($14, 22), COALESCE($15, 8)) \
             ON CONFLICT (user_id) DO UPDATE SET \
                social_enabled = COALESCE($2, p.social_enabled), \
                group_enabled = COALESCE($3, p.group_enabled), \
                invite_enabled = COALESCE($4, p.invite_enabled), \
                content_enabled = COALESCE($5, p.content_enabled), \
                note_likes_enabled = COALESCE($6, p.note_likes_enabled), \
                note_comments_enabled = COALESCE($7, p.note_comments_enabled), \
                message_replies_enabled = COALESCE($8, p.message_replies_enabled), \
                new_notes_enabled = COALESCE($9, p.new_notes_enabled), \
                member_joins_enabled = COALESCE($10, p.member_joins_enabled), \
                batch_similar = COALESCE($11, p.batch_similar), \
                batch_window_minutes = COALESCE($12, p.batch_window_minutes), \
                quiet_hours_enabled = COALESCE($13, p.quiet_hours_enabled), \
                quiet_start_hour = COALESCE($14, p.quiet_start_hour), \
                quiet_end_hour = COALESCE($15, p.quiet_end_hour), \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationPreferences>(&query)
            .bind(user_id)
            .bind(input.social_enabled)
            .bind(input.group_enabled)
            .bind(input.invite_enabled)
            .bind(input.content_enabled)
            .bind(input.note_likes_enabled)
            .bind(input.note_comments_enabled)
            .bind(input.message_replies_enabled)
            .bind(input.new_notes_enabled)
            .bind(input.member_joins_enabled)
            .bind(input.batch_similar)
            .bind(input.batch_window_minutes)
            .bind(input.quiet_hours_enabled)
            .bind(input.quiet_start_hour)
            .bind(input.quiet_end_hour)
            .fetch_one(pool)
            .await
    }
}
