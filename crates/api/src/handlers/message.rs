//! Handlers for group chat messages and their delivery receipts.
//!
//! Every endpoint requires the caller to be a member of the group the
//! message belongs to.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use studybuddy_core::error::CoreError;
use studybuddy_core::message_status::{aggregate_status, DeliveryStatus};
use studybuddy_core::types::DbId;
use studybuddy_db::models::group::GroupMember;
use studybuddy_db::models::message::{CreateMessage, Message};
use studybuddy_db::models::message_status::{MessageStatus, MessageStatusWithProfile};
use studybuddy_db::repositories::{
    GroupMemberRepo, MessageRepo, MessageStatusRepo, StudyGroupRepo, UserRepo,
};
use studybuddy_db::DbPool;
use studybuddy_events::{ActorInfo, CachedMessage, GroupRef, NotificationTriggers};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum page size for message listing.
const MAX_LIMIT: i64 = 100;

/// Characters of the reply kept in the notification preview.
const PREVIEW_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MessagePageQuery {
    /// Defaults to and is capped at 100.
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 4000))]
    pub content: String,
    pub reply_to_id: Option<DbId>,
}

/// Read receipts for one message.
#[derive(Debug, Serialize)]
pub struct MessageReceipts {
    pub message_id: DbId,
    /// Least advanced status across recipients, excluding the sender.
    pub aggregate: DeliveryStatus,
    pub statuses: Vec<MessageStatusWithProfile>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn require_member(pool: &DbPool, group_id: DbId, user_id: DbId) -> AppResult<GroupMember> {
    GroupMemberRepo::find(pool, group_id, user_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Forbidden(format!(
                "Not a member of group {group_id}"
            )))
        })
}

fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// GET /api/v1/groups/{id}/messages
///
/// Returns the most recent page (oldest first) with each message's status
/// rows. Fetching a page marks every message in it not sent by the caller
/// as delivered.
pub async fn list_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
    Query(params): Query<MessagePageQuery>,
) -> AppResult<Json<DataResponse<Vec<CachedMessage>>>> {
    let member = require_member(&state.pool, group_id, auth.user_id).await?;
    let limit = params.limit.unwrap_or(MAX_LIMIT).clamp(1, MAX_LIMIT);

    let messages =
        MessageRepo::list_for_group(&state.pool, group_id, Some(member.joined_at), limit).await?;

    state
        .status_store
        .mark_group_delivered(group_id, auth.user_id, Some(member.joined_at))
        .await?;

    let ids: Vec<DbId> = messages.iter().map(|m| m.id).collect();
    let mut by_message: HashMap<DbId, Vec<MessageStatus>> = HashMap::new();
    for status in MessageStatusRepo::list_for_messages(&state.pool, &ids).await? {
        by_message.entry(status.message_id).or_default().push(status);
    }

    let page = messages
        .into_iter()
        .map(|message| {
            let statuses = by_message.remove(&message.id).unwrap_or_default();
            CachedMessage { message, statuses }
        })
        .collect();

    Ok(Json(DataResponse { data: page }))
}

/// POST /api/v1/groups/{id}/messages
///
/// Persists the message and the sender's `sent` row in one transaction,
/// then publishes both on the realtime streams, message first. Replies
/// notify the original sender in the background.
pub async fn send_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
    Json(input): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Message>>)> {
    input.validate()?;
    if input.content.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Message content must not be blank".into(),
        )));
    }
    require_member(&state.pool, group_id, auth.user_id).await?;

    let original = match input.reply_to_id {
        Some(reply_to_id) => {
            let original = MessageRepo::find_by_id(&state.pool, reply_to_id)
                .await?
                .filter(|m| m.group_id == group_id)
                .ok_or(AppError::Core(CoreError::NotFound {
                    entity: "Message",
                    id: reply_to_id,
                }))?;
            Some(original)
        }
        None => None,
    };

    let message = state
        .status_store
        .send_message(&CreateMessage {
            group_id,
            sender_id: auth.user_id,
            content: input.content,
            reply_to_id: input.reply_to_id,
        })
        .await?;

    tracing::info!(
        message_id = message.id,
        group_id,
        sender_id = auth.user_id,
        "Message sent"
    );

    if let Some(original) = original {
        tokio::spawn(notify_reply(
            state.pool.clone(),
            state.triggers.clone(),
            original,
            message.clone(),
        ));
    }

    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}

async fn notify_reply(
    pool: DbPool,
    triggers: NotificationTriggers,
    original: Message,
    reply: Message,
) {
    let (sender, group) = match tokio::try_join!(
        UserRepo::find_by_id(&pool, reply.sender_id),
        StudyGroupRepo::find_by_id(&pool, reply.group_id),
    ) {
        Ok((Some(sender), Some(group))) => (sender, group),
        Ok(_) => {
            tracing::warn!(message_id = reply.id, "Reply sender or group vanished");
            return;
        }
        Err(e) => {
            tracing::error!(message_id = reply.id, error = %e, "Failed to load reply context");
            return;
        }
    };

    let actor = ActorInfo {
        id: sender.id,
        name: sender.display_name,
        avatar: sender.avatar_url,
    };
    let group = GroupRef {
        id: group.id,
        name: group.name,
    };
    triggers
        .notify_message_replied(
            original.sender_id,
            &actor,
            &group,
            reply.id,
            &preview(&reply.content),
        )
        .await;
}

/// POST /api/v1/groups/{id}/seen
pub async fn mark_seen(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    require_member(&state.pool, group_id, auth.user_id).await?;

    let updated = state
        .status_store
        .mark_group_as_seen(group_id, auth.user_id)
        .await?;

    Ok(Json(serde_json::json!({
        "data": { "updated": updated.len() }
    })))
}

/// GET /api/v1/messages/{id}/statuses
pub async fn message_statuses(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<DbId>,
) -> AppResult<Json<DataResponse<MessageReceipts>>> {
    let message = MessageRepo::find_by_id(&state.pool, message_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Message",
            id: message_id,
        }))?;
    require_member(&state.pool, message.group_id, auth.user_id).await?;

    let statuses = state.status_store.get_statuses_for_message(message_id).await?;
    let aggregate = aggregate_status(
        statuses
            .iter()
            .filter(|s| s.user_id != message.sender_id)
            .filter_map(|s| DeliveryStatus::from_str(&s.status).ok()),
    );

    Ok(Json(DataResponse {
        data: MessageReceipts {
            message_id,
            aggregate,
            statuses,
        },
    }))
}
