//! Alert signalling for newly created high-priority notifications.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use studybuddy_core::types::DbId;
use studybuddy_db::models::notification::Notification;

/// Payload handed to an [`AlertSink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSignal {
    pub user_id: DbId,
    pub notification_id: DbId,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
}

impl From<&Notification> for AlertSignal {
    fn from(row: &Notification) -> Self {
        Self {
            user_id: row.user_id,
            notification_id: row.id,
            title: row.title.clone(),
            message: row.message.clone(),
            action_url: row.action_url.clone(),
        }
    }
}

/// Receives alert signals from the dispatcher.
///
/// Implementations must not fail the dispatch; delivery problems are logged
/// by the sink itself.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn signal(&self, alert: AlertSignal);
}

/// Discards every signal.
pub struct NoopAlertSink;

#[async_trait]
impl AlertSink for NoopAlertSink {
    async fn signal(&self, alert: AlertSignal) {
        tracing::trace!(user_id = alert.user_id, "Alert discarded");
    }
}

/// Keeps every signal in memory.
#[derive(Default)]
pub struct RecordingAlertSink {
    signals: Mutex<Vec<AlertSignal>>,
}

impl RecordingAlertSink {
    pub fn signals(&self) -> Vec<AlertSignal> {
        self.signals
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn signal(&self, alert: AlertSignal) {
        if let Ok(mut signals) = self.signals.lock() {
            signals.push(alert);
        }
    }
}
