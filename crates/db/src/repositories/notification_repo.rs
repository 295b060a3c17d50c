//! Repository for the `notifications` table.

use sqlx::PgPool;
use studybuddy_core::types::{DbId, Timestamp};

use crate::models::notification::{NewNotification, Notification, NotificationMerge};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, user_id, category, action, priority, title, message, \
    actor_label, message_suffix, metadata, action_url, group_key, is_read, read_at, \
    is_archived, archived_at, version, created_at, updated_at";

/// Provides CRUD and batching operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notification row.
    pub async fn insert(
        pool: &PgPool,
        input: &NewNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications \
                (user_id, category, action, priority, title, message, actor_label, \
                 message_suffix, metadata, action_url, group_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.user_id)
            .bind(input.action.category().as_str())
            .bind(input.action.as_str())
            .bind(input.priority.as_str())
            .bind(&input.title)
            .bind(input.body.render())
            .bind(&input.body.actor)
            .bind(&input.body.suffix)
            .bind(input.metadata.to_json())
            .bind(&input.action_url)
            .bind(&input.group_key)
            .fetch_one(pool)
            .await
    }

    /// Find the most recent open row that a batched event can merge into.
    ///
    /// Open means unread and not archived. Only rows created at or after
    /// `cutoff` qualify.
    pub async fn find_merge_candidate(
        pool: &PgPool,
        user_id: DbId,
        group_key: &str,
        cutoff: Timestamp,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 \
               AND group_key = $2 \
               AND is_read = false \
               AND is_archived = false \
               AND created_at >= $3 \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(group_key)
            .bind(cutoff)
            .fetch_optional(pool)
            .await
    }

    /// Fold a batched event into an existing row.
    ///
    /// The write only lands if the row is still at `expected_version` and
    /// still open. Returns `None` when another writer got there first or the
    /// row was read or archived in the meantime.
    pub async fn apply_merge(
        pool: &PgPool,
        id: DbId,
        expected_version: i32,
        merge: &NotificationMerge,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications SET \
                message = $3, \
                actor_label = $4, \
                message_suffix = $5, \
                metadata = $6, \
                created_at = $7, \
                version = version + 1, \
                updated_at = NOW() \
             WHERE id = $1 \
               AND version = $2 \
               AND is_read = false \
               AND is_archived = false \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(merge.body.render())
            .bind(&merge.body.actor)
            .bind(&merge.body.suffix)
            .bind(&merge.metadata)
            .bind(merge.bumped_at)
            .fetch_optional(pool)
            .await
    }

    /// List notifications for a user, newest first.
    ///
    /// Archived rows are hidden unless `include_archived` is set.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        unread_only: bool,
        include_archived: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let mut filter = String::new();
        if unread_only {
            filter.push_str(" AND is_read = false");
        }
        if !include_archived {
            filter.push_str(" AND is_archived = false");
        }
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1{filter} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark a single notification as read.
    ///
    /// Returns `true` if the notification was found for the given user and
    /// updated, `false` otherwise.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND is_read = false",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark all unread notifications as read for a user.
    ///
    /// Returns the number of notifications that were marked read.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = NOW(), updated_at = NOW() \
             WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Archive a notification. Archived rows stop absorbing batched events.
    pub async fn archive(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_archived = true, archived_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND is_archived = false",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count unread, unarchived notifications for a user.
    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications \
             WHERE user_id = $1 AND is_read = false AND is_archived = false",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
