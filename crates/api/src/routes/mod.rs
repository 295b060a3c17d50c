pub mod health;
pub mod message;
pub mod notification;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                   WebSocket session (?token=)
///
/// /notifications                        list
/// /notifications/unread-count           unread count
/// /notifications/read-all               mark all read
/// /notifications/{id}/read              mark one read
/// /notifications/{id}/archive           archive one
/// /notifications/preferences            get, partial update
///
/// /groups/{id}/messages                 page fetch, send
/// /groups/{id}/seen                     mark group seen
/// /messages/{id}/statuses               read receipts
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/notifications", notification::router())
        .nest("/groups", message::group_router())
        .nest("/messages", message::message_router())
}
