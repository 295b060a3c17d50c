//! Repository for the `messages` table.

use sqlx::PgPool;
use studybuddy_core::types::{DbId, Timestamp};

use studybuddy_core::message_status::DeliveryStatus;

use crate::models::message::{CreateMessage, Message};
use crate::models::message_status::MessageStatus;

/// Column list for `messages` queries.
const COLUMNS: &str = "id, group_id, sender_id, content, reply_to_id, created_at, updated_at";

/// Provides CRUD operations for group messages.
pub struct MessageRepo;

impl MessageRepo {
    /// Persist a new message, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateMessage) -> Result<Message, sqlx::Error> {
        let query = format!(
            "INSERT INTO messages (group_id, sender_id, content, reply_to_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(input.group_id)
            .bind(input.sender_id)
            .bind(&input.content)
            .bind(input.reply_to_id)
            .fetch_one(pool)
            .await
    }

    /// Persist a new message together with the sender's `sent` status row.
    ///
    /// Both rows are written in one transaction; neither exists on failure.
    pub async fn create_with_sent_status(
        pool: &PgPool,
        input: &CreateMessage,
    ) -> Result<(Message, MessageStatus), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO messages (group_id, sender_id, content, reply_to_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let message = sqlx::query_as::<_, Message>(&query)
            .bind(input.group_id)
            .bind(input.sender_id)
            .bind(&input.content)
            .bind(input.reply_to_id)
            .fetch_one(&mut *tx)
            .await?;

        let status = sqlx::query_as::<_, MessageStatus>(
            "INSERT INTO message_statuses (message_id, user_id, status) \
             VALUES ($1, $2, $3) \
             RETURNING id, message_id, user_id, status, created_at, updated_at",
        )
        .bind(message.id)
        .bind(message.sender_id)
        .bind(DeliveryStatus::Sent.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((message, status))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Message>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM messages WHERE id = $1");
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a group's messages in chronological order.
    ///
    /// When `since` is set, only messages created at or after it are
    /// returned (members do not see history from before they joined).
    pub async fn list_for_group(
        pool: &PgPool,
        group_id: DbId,
        since: Option<Timestamp>,
        limit: i64,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ( \
                SELECT {COLUMNS} FROM messages \
                WHERE group_id = $1 AND ($2::timestamptz IS NULL OR created_at >= $2) \
                ORDER BY created_at DESC, id DESC \
                LIMIT $3 \
             ) recent \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(group_id)
            .bind(since)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
