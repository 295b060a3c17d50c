//! Delivery status store.
//!
//! Wraps [`MessageStatusRepo`] and publishes every successful write on the
//! [`RealtimeHub`] status stream so open reconcilers can fold it in.

use std::sync::Arc;

use studybuddy_core::error::CoreError;
use studybuddy_core::message_status::DeliveryStatus;
use studybuddy_core::types::{DbId, Timestamp};
use studybuddy_db::models::message::{CreateMessage, Message};
use studybuddy_db::models::message_status::{MessageStatus, MessageStatusWithProfile};
use studybuddy_db::repositories::{MessageRepo, MessageStatusRepo};
use studybuddy_db::DbPool;

use crate::error::EventError;
use crate::realtime::{RealtimeHub, StatusChange};

/// Per-message, per-recipient delivery state.
#[derive(Clone)]
pub struct StatusStore {
    pool: DbPool,
    hub: Arc<RealtimeHub>,
}

impl StatusStore {
    pub fn new(pool: DbPool, hub: Arc<RealtimeHub>) -> Self {
        Self { pool, hub }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn hub(&self) -> &Arc<RealtimeHub> {
        &self.hub
    }

    /// Insert a new status row.
    ///
    /// Returns [`CoreError::Conflict`] if the pair already has a row; use
    /// [`update_status`](Self::update_status) for idempotent writes.
    pub async fn create_status(
        &self,
        message_id: DbId,
        user_id: DbId,
        status: DeliveryStatus,
    ) -> Result<MessageStatus, EventError> {
        let row = MessageStatusRepo::create(&self.pool, message_id, user_id, status)
            .await
            .map_err(|e| {
                if studybuddy_db::is_unique_violation(&e) {
                    EventError::Core(CoreError::Conflict(format!(
                        "Status for message {message_id} and user {user_id} already exists"
                    )))
                } else {
                    EventError::Persistence(e)
                }
            })?;
        self.hub.publish_status(StatusChange::inserted(row.clone()));
        Ok(row)
    }

    /// Upsert the status for a pair. Last writer wins; regressions such as
    /// `seen` back to `delivered` are not rejected.
    pub async fn update_status(
        &self,
        message_id: DbId,
        user_id: DbId,
        status: DeliveryStatus,
    ) -> Result<MessageStatus, EventError> {
        let upserted = MessageStatusRepo::upsert(&self.pool, message_id, user_id, status).await?;
        let change = if upserted.inserted {
            StatusChange::inserted(upserted.status.clone())
        } else {
            StatusChange::updated(upserted.status.clone())
        };
        self.hub.publish_status(change);
        Ok(upserted.status)
    }

    /// All recipient rows for a message with display name and avatar.
    pub async fn get_statuses_for_message(
        &self,
        message_id: DbId,
    ) -> Result<Vec<MessageStatusWithProfile>, EventError> {
        Ok(MessageStatusRepo::list_for_message_with_profiles(&self.pool, message_id).await?)
    }

    /// Mark every message in the group as seen for `user_id`.
    ///
    /// Messages without an existing row for the user are skipped. Calling
    /// this again with nothing new returns an empty list.
    pub async fn mark_group_as_seen(
        &self,
        group_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<MessageStatus>, EventError> {
        let rows = MessageStatusRepo::mark_group_seen(&self.pool, group_id, user_id).await?;
        for row in &rows {
            self.hub.publish_status(StatusChange::updated(row.clone()));
        }
        tracing::debug!(group_id, user_id, updated = rows.len(), "Marked group as seen");
        Ok(rows)
    }

    /// Record `delivered` for every group message the user has not observed
    /// yet, excluding their own. Used on page fetch.
    pub async fn mark_group_delivered(
        &self,
        group_id: DbId,
        user_id: DbId,
        since: Option<Timestamp>,
    ) -> Result<Vec<MessageStatus>, EventError> {
        let rows =
            MessageStatusRepo::mark_group_delivered(&self.pool, group_id, user_id, since).await?;
        for row in &rows {
            self.hub.publish_status(StatusChange::inserted(row.clone()));
        }
        Ok(rows)
    }

    /// Persist a message with the sender's own `sent` row, then publish both.
    ///
    /// The rows are committed together. The message is published before its
    /// status so open reconcilers see the message first.
    pub async fn send_message(&self, input: &CreateMessage) -> Result<Message, EventError> {
        let (message, sent) = MessageRepo::create_with_sent_status(&self.pool, input).await?;
        self.hub.publish_message(message.clone());
        self.hub.publish_status(StatusChange::inserted(sent));
        Ok(message)
    }
}
