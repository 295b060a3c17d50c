use std::sync::Arc;

use studybuddy_events::{
    AlertSink, EmailDelivery, NotificationDispatcher, NotificationTriggers, RealtimeHub,
    Reconciler, StatusStore,
};

use crate::config::ServerConfig;
use crate::ws::{WsAlertSink, WsManager};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; inner data is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: studybuddy_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Status writes; also owns the in-process message and status streams.
    pub status_store: StatusStore,
    pub reconciler: Reconciler,
    pub triggers: NotificationTriggers,
}

impl AppState {
    /// Wire the notification and delivery services around one pool.
    ///
    /// Alerts are pushed to the recipient's open WebSocket connections.
    pub fn new(
        pool: studybuddy_db::DbPool,
        config: ServerConfig,
        ws_manager: Arc<WsManager>,
        email: Option<EmailDelivery>,
    ) -> Self {
        let hub = Arc::new(RealtimeHub::default());
        let status_store = StatusStore::new(pool.clone(), Arc::clone(&hub));
        let reconciler = Reconciler::new(status_store.clone());

        let alerts: Arc<dyn AlertSink> = Arc::new(WsAlertSink::new(Arc::clone(&ws_manager)));
        let dispatcher = NotificationDispatcher::new(pool.clone(), alerts);
        let triggers =
            NotificationTriggers::new(dispatcher, email.map(Arc::new), config.alerts_enabled);

        Self {
            pool,
            config: Arc::new(config),
            ws_manager,
            status_store,
            reconciler,
            triggers,
        }
    }
}
