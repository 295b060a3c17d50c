//! Route definitions for group chat messages.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::message;
use crate::state::AppState;

/// Routes mounted at `/groups`.
///
/// ```text
/// GET    /{id}/messages    -> list_messages
/// POST   /{id}/messages    -> send_message
/// POST   /{id}/seen        -> mark_seen
/// ```
pub fn group_router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/messages",
            get(message::list_messages).post(message::send_message),
        )
        .route("/{id}/seen", post(message::mark_seen))
}

/// Routes mounted at `/messages`.
///
/// ```text
/// GET    /{id}/statuses    -> message_statuses
/// ```
pub fn message_router() -> Router<AppState> {
    Router::new().route("/{id}/statuses", get(message::message_statuses))
}
