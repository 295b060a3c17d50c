//! Repository for the `message_statuses` table.
//!
//! The `(message_id, user_id)` pair is unique. [`MessageStatusRepo::create`]
//! is the strict insert path; [`MessageStatusRepo::upsert`] is the idempotent
//! last-writer-wins path. Neither enforces monotonic transitions.

use sqlx::PgPool;
use studybuddy_core::message_status::{DeliveryStatus, STATUS_DELIVERED, STATUS_SEEN};
use studybuddy_core::types::{DbId, Timestamp};

use crate::models::message_status::{MessageStatus, MessageStatusWithProfile, UpsertedStatus};

/// Column list for `message_statuses` queries.
const COLUMNS: &str = "id, message_id, user_id, status, created_at, updated_at";

/// Provides delivery-status persistence.
pub struct MessageStatusRepo;

impl MessageStatusRepo {
    /// Insert a new status row.
    ///
    /// Fails with a unique violation (`uq_message_statuses_message_user`) if
    /// a row for the pair already exists.
    pub async fn create(
        pool: &PgPool,
        message_id: DbId,
        user_id: DbId,
        status: DeliveryStatus,
    ) -> Result<MessageStatus, sqlx::Error> {
        let query = format!(
            "INSERT INTO message_statuses (message_id, user_id, status) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MessageStatus>(&query)
            .bind(message_id)
            .bind(user_id)
            .bind(status.as_str())
            .fetch_one(pool)
            .await
    }

    /// Insert or overwrite the status for a pair.
    ///
    /// `inserted` on the result distinguishes a new row from an update
    /// (`xmax = 0` only holds for freshly inserted tuples).
    pub async fn upsert(
        pool: &PgPool,
        message_id: DbId,
        user_id: DbId,
        status: DeliveryStatus,
    ) -> Result<UpsertedStatus, sqlx::Error> {
        let query = format!(
            "INSERT INTO message_statuses (message_id, user_id, status) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (message_id, user_id) DO UPDATE SET \
                status = EXCLUDED.status, \
                updated_at = NOW() \
             RETURNING {COLUMNS}, (xmax = 0) AS inserted"
        );
        sqlx::query_as::<_, UpsertedStatus>(&query)
            .bind(message_id)
            .bind(user_id)
            .bind(status.as_str())
            .fetch_one(pool)
            .await
    }

    /// Get the status row for a single pair.
    pub async fn find(
        pool: &PgPool,
        message_id: DbId,
        user_id: DbId,
    ) -> Result<Option<MessageStatus>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM message_statuses WHERE message_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, MessageStatus>(&query)
            .bind(message_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List all status rows of a message joined with recipient profiles.
    pub async fn list_for_message_with_profiles(
        pool: &PgPool,
        message_id: DbId,
    ) -> Result<Vec<MessageStatusWithProfile>, sqlx::Error> {
        sqlx::query_as::<_, MessageStatusWithProfile>(
            "SELECT ms.id, ms.message_id, ms.user_id, ms.status, ms.created_at, ms.updated_at, \
                    u.display_name, u.avatar_url \
             FROM message_statuses ms \
             JOIN users u ON u.id = ms.user_id \
             WHERE ms.message_id = $1 \
             ORDER BY ms.updated_at, ms.id",
        )
        .bind(message_id)
        .fetch_all(pool)
        .await
    }

    /// List the status rows for a batch of messages.
    pub async fn list_for_messages(
        pool: &PgPool,
        message_ids: &[DbId],
    ) -> Result<Vec<MessageStatus>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM message_statuses \
             WHERE message_id = ANY($1) \
             ORDER BY message_id, id"
        );
        sqlx::query_as::<_, MessageStatus>(&query)
            .bind(message_ids)
            .fetch_all(pool)
            .await
    }

    /// Mark every message of a group as seen for `user_id`.
    ///
    /// Only rows that already exist for the user are updated; messages the
    /// user has no row for are skipped, never synthesized. Rows already at
    /// `seen` are left untouched, so repeated calls return nothing.
    pub async fn mark_group_seen(
        pool: &PgPool,
        group_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<MessageStatus>, sqlx::Error> {
        sqlx::query_as::<_, MessageStatus>(
            "UPDATE message_statuses ms \
             SET status = $3, updated_at = NOW() \
             FROM messages m \
             WHERE ms.message_id = m.id \
               AND m.group_id = $1 \
               AND ms.user_id = $2 \
               AND ms.status <> $3 \
             RETURNING ms.id, ms.message_id, ms.user_id, ms.status, ms.created_at, ms.updated_at",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(STATUS_SEEN)
        .fetch_all(pool)
        .await
    }

    /// Record `delivered` for every group message `user_id` has not observed.
    ///
    /// Skips the user's own messages and any message that already has a row
    /// for the user, so an existing `seen` is never downgraded. Returns the
    /// inserted rows.
    pub async fn mark_group_delivered(
        pool: &PgPool,
        group_id: DbId,
        user_id: DbId,
        since: Option<Timestamp>,
    ) -> Result<Vec<MessageStatus>, sqlx::Error> {
        let query = format!(
            "INSERT INTO message_statuses (message_id, user_id, status) \
             SELECT m.id, $2, $3 FROM messages m \
             WHERE m.group_id = $1 \
               AND m.sender_id <> $2 \
               AND ($4::timestamptz IS NULL OR m.created_at >= $4) \
             ON CONFLICT (message_id, user_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MessageStatus>(&query)
            .bind(group_id)
            .bind(user_id)
            .bind(STATUS_DELIVERED)
            .bind(since)
            .fetch_all(pool)
            .await
    }
}
