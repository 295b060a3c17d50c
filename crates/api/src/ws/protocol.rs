//! JSON frames exchanged over a realtime session, tagged by `type`.
//!
//! ```text
//! client -> server   group.open {group_id}
//!                    group.close
//! server -> client   group.opened {group_id, messages}
//!                    group.closed {group_id}
//!                    message.appended {message}
//!                    status.upserted {status}
//!                    notification.alert {alert}
//!                    error {code, message}
//! ```

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use studybuddy_core::types::DbId;
use studybuddy_db::models::message_status::MessageStatus;
use studybuddy_events::{AlertSignal, CacheChange, CachedMessage};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "group.open")]
    GroupOpen { group_id: DbId },
    #[serde(rename = "group.close")]
    GroupClose,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Initial cache contents after a successful open.
    #[serde(rename = "group.opened")]
    GroupOpened {
        group_id: DbId,
        messages: Vec<CachedMessage>,
    },
    #[serde(rename = "group.closed")]
    GroupClosed { group_id: DbId },
    #[serde(rename = "message.appended")]
    MessageAppended { message: CachedMessage },
    #[serde(rename = "status.upserted")]
    StatusUpserted { status: MessageStatus },
    #[serde(rename = "notification.alert")]
    NotificationAlert { alert: AlertSignal },
    #[serde(rename = "error")]
    Error { code: &'static str, message: String },
}

impl From<CacheChange> for ServerMessage {
    fn from(change: CacheChange) -> Self {
        match change {
            CacheChange::MessageAppended(message) => ServerMessage::MessageAppended { message },
            CacheChange::StatusUpserted(status) => ServerMessage::StatusUpserted { status },
        }
    }
}

impl ServerMessage {
    /// Encode as a text frame. Returns `None` (and logs) if serialization
    /// fails.
    pub fn to_frame(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(text) => Some(Message::Text(text.into())),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode WebSocket frame");
                None
            }
        }
    }
}
