//! In-process realtime hub backed by two `tokio::sync::broadcast` channels.
//!
//! Message inserts and status changes travel on independent streams. Each
//! stream is FIFO; nothing orders one stream relative to the other.

use serde::Serialize;
use studybuddy_db::models::message::Message;
use studybuddy_db::models::message_status::MessageStatus;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// StatusChange
// ---------------------------------------------------------------------------

/// Whether a status write created the row or overwrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
}

/// A row-level change on `message_statuses`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub kind: ChangeKind,
    pub status: MessageStatus,
}

impl StatusChange {
    pub fn inserted(status: MessageStatus) -> Self {
        Self {
            kind: ChangeKind::Insert,
            status,
        }
    }

    pub fn updated(status: MessageStatus) -> Self {
        Self {
            kind: ChangeKind::Update,
            status,
        }
    }
}

// ---------------------------------------------------------------------------
// RealtimeHub
// ---------------------------------------------------------------------------

/// Default buffer capacity for each broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out hub for the message-insert and status-change streams.
///
/// Shared via `Arc<RealtimeHub>`. Publishing with no subscribers drops the
/// event; slow subscribers observe `RecvError::Lagged`.
pub struct RealtimeHub {
    messages: broadcast::Sender<Message>,
    statuses: broadcast::Sender<StatusChange>,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        let (messages, _) = broadcast::channel(capacity);
        let (statuses, _) = broadcast::channel(capacity);
        Self { messages, statuses }
    }

    /// Publish a newly persisted message.
    pub fn publish_message(&self, message: Message) {
        let _ = self.messages.send(message);
    }

    /// Publish a status row change.
    pub fn publish_status(&self, change: StatusChange) {
        let _ = self.statuses.send(change);
    }

    pub fn subscribe_messages(&self) -> broadcast::Receiver<Message> {
        self.messages.subscribe()
    }

    pub fn subscribe_statuses(&self) -> broadcast::Receiver<StatusChange> {
        self.statuses.subscribe()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn message(id: i64) -> Message {
        Message {
            id,
            group_id: 1,
            sender_id: 2,
            content: "hello".to_string(),
            reply_to_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn status(message_id: i64) -> MessageStatus {
        MessageStatus {
            id: 1,
            message_id,
            user_id: 3,
            status: "delivered".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn streams_are_independent() {
        let hub = RealtimeHub::default();
        let mut messages = hub.subscribe_messages();
        let mut statuses = hub.subscribe_statuses();

        hub.publish_status(StatusChange::inserted(status(10)));
        hub.publish_message(message(10));

        assert_eq!(messages.recv().await.unwrap().id, 10);
        let change = statuses.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Insert);
        assert_eq!(change.status.message_id, 10);
        assert!(messages.try_recv().is_err());
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let hub = RealtimeHub::default();
        hub.publish_message(message(1));
        hub.publish_status(StatusChange::updated(status(1)));
    }

    #[tokio::test]
    async fn every_subscriber_sees_each_message() {
        let hub = RealtimeHub::default();
        let mut a = hub.subscribe_messages();
        let mut b = hub.subscribe_messages();
        hub.publish_message(message(5));
        assert_eq!(a.recv().await.unwrap().id, 5);
        assert_eq!(b.recv().await.unwrap().id, 5);
    }
}
