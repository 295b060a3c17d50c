//! WebSocket infrastructure for real-time sessions.
//!
//! Provides connection management, heartbeat monitoring, the session
//! protocol, and the HTTP upgrade handler used by Axum routes.

mod alert;
mod handler;
mod heartbeat;
pub mod manager;
pub mod protocol;

pub use alert::WsAlertSink;
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
