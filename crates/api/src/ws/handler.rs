use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use studybuddy_core::error::CoreError;
use studybuddy_events::{CacheChange, EventError, ReconcilerSession};

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::ws::manager::WsSender;
use crate::ws::protocol::{ClientMessage, ServerMessage};

/// Query parameters for `GET /ws`. Browsers cannot set headers on the
/// upgrade request, so the access token travels in the query string.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

enum SessionEvent {
    Inbound(Option<Result<Message, axum::Error>>),
    Change(Option<CacheChange>),
}

/// HTTP handler that authenticates and upgrades the connection.
///
/// A missing or invalid token is rejected with 401 before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsAuthQuery>,
) -> Result<impl IntoResponse, AppError> {
    let token = params.token.ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized("Missing token query parameter".into()))
    })?;
    let auth = AuthUser::from_token(&token, &state.config.jwt)?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, auth)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Registers the connection, forwards outbound frames on a spawned task,
/// and multiplexes inbound client frames with changes from the session's
/// open group. The open group is closed on every exit path.
async fn handle_socket(socket: WebSocket, state: AppState, auth: AuthUser) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let user_id = auth.user_id;
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket connected");

    let (tx, mut rx) = state.ws_manager.add(conn_id.clone(), user_id).await;
    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    let mut session = ReconcilerSession::new(state.reconciler.clone(), user_id);

    loop {
        let event = tokio::select! {
            inbound = stream.next() => SessionEvent::Inbound(inbound),
            change = next_session_change(&mut session) => SessionEvent::Change(change),
        };

        match event {
            SessionEvent::Inbound(Some(Ok(Message::Text(text)))) => {
                handle_client_text(text.as_str(), &mut session, &tx).await;
            }
            SessionEvent::Inbound(Some(Ok(Message::Close(_))) | None) => break,
            SessionEvent::Inbound(Some(Ok(Message::Pong(_)))) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            SessionEvent::Inbound(Some(Ok(_))) => {}
            SessionEvent::Inbound(Some(Err(e))) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
            SessionEvent::Change(Some(change)) => send(&tx, ServerMessage::from(change)),
            SessionEvent::Change(None) => {
                // Subscription task ended underneath us.
                if let Some(group_id) = session.active().map(|h| h.group_id()) {
                    session.close_group().await;
                    send(&tx, ServerMessage::GroupClosed { group_id });
                }
            }
        }
    }

    session.close_group().await;
    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket disconnected");
}

async fn handle_client_text(text: &str, session: &mut ReconcilerSession, tx: &WsSender) {
    let request = match serde_json::from_str::<ClientMessage>(text) {
        Ok(request) => request,
        Err(e) => {
            send(
                tx,
                ServerMessage::Error {
                    code: "BAD_REQUEST",
                    message: format!("Unrecognised frame: {e}"),
                },
            );
            return;
        }
    };

    match request {
        ClientMessage::GroupOpen { group_id } => match session.open_group(group_id).await {
            Ok(handle) => {
                let messages = handle.snapshot().await;
                send(tx, ServerMessage::GroupOpened { group_id, messages });
            }
            Err(e) => send(tx, open_error(e)),
        },
        ClientMessage::GroupClose => {
            if let Some(group_id) = session.active().map(|h| h.group_id()) {
                session.close_group().await;
                send(tx, ServerMessage::GroupClosed { group_id });
            }
        }
    }
}

fn open_error(err: EventError) -> ServerMessage {
    match err {
        EventError::Core(CoreError::Forbidden(message)) => ServerMessage::Error {
            code: "FORBIDDEN",
            message,
        },
        other => {
            tracing::error!(error = %other, "Failed to open group subscription");
            ServerMessage::Error {
                code: "INTERNAL_ERROR",
                message: "Could not open group".to_string(),
            }
        }
    }
}

/// Next change from the open group, or pending forever when none is open.
async fn next_session_change(session: &mut ReconcilerSession) -> Option<CacheChange> {
    match session.active_mut() {
        Some(handle) => handle.next_change().await,
        None => std::future::pending().await,
    }
}

fn send(tx: &WsSender, message: ServerMessage) {
    if let Some(frame) = message.to_frame() {
        let _ = tx.send(frame);
    }
}
