use std::sync::Arc;

use async_trait::async_trait;
use studybuddy_events::{AlertSignal, AlertSink};

use crate::ws::manager::WsManager;
use crate::ws::protocol::ServerMessage;

/// Pushes alert signals to every open connection of the recipient.
/// Recipients without a connection simply miss the alert; the stored
/// notification remains.
pub struct WsAlertSink {
    ws_manager: Arc<WsManager>,
}

impl WsAlertSink {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }
}

#[async_trait]
impl AlertSink for WsAlertSink {
    async fn signal(&self, alert: AlertSignal) {
        let user_id = alert.user_id;
        let notification_id = alert.notification_id;
        let Some(frame) = ServerMessage::NotificationAlert { alert }.to_frame() else {
            return;
        };
        let delivered = self.ws_manager.send_to_user(user_id, frame).await;
        tracing::debug!(user_id, notification_id, delivered, "Alert pushed");
    }
}
