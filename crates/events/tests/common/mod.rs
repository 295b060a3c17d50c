//! Shared fixtures for the events integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sqlx::PgPool;
use studybuddy_core::types::DbId;
use studybuddy_db::models::group::CreateStudyGroup;
use studybuddy_db::models::message::{CreateMessage, Message};
use studybuddy_db::models::user::CreateUser;
use studybuddy_db::repositories::{GroupMemberRepo, MessageRepo, StudyGroupRepo, UserRepo};
use studybuddy_events::{
    ActorInfo, NotificationDispatcher, NotificationTriggers, RealtimeHub, RecordingAlertSink,
    StatusStore,
};

pub async fn create_user(pool: &PgPool, name: &str) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            display_name: name.to_string(),
            avatar_url: None,
            email: format!("{}@example.com", name.to_lowercase()),
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn create_group(pool: &PgPool, name: &str, members: &[DbId]) -> DbId {
    let group = StudyGroupRepo::create(
        pool,
        &CreateStudyGroup {
            name: name.to_string(),
        },
    )
    .await
    .unwrap();
    for member in members {
        GroupMemberRepo::add(pool, group.id, *member).await.unwrap();
    }
    group.id
}

/// Persist a message directly, bypassing the realtime hub.
pub async fn insert_message(pool: &PgPool, group_id: DbId, sender_id: DbId, text: &str) -> Message {
    MessageRepo::create(
        pool,
        &CreateMessage {
            group_id,
            sender_id,
            content: text.to_string(),
            reply_to_id: None,
        },
    )
    .await
    .unwrap()
}

/// Send a message through the status store: persisted with the sender's
/// `sent` row and published on the hub.
pub async fn send_message(
    store: &StatusStore,
    group_id: DbId,
    sender_id: DbId,
    text: &str,
) -> Message {
    store
        .send_message(&CreateMessage {
            group_id,
            sender_id,
            content: text.to_string(),
            reply_to_id: None,
        })
        .await
        .unwrap()
}

pub fn actor(id: DbId, name: &str) -> ActorInfo {
    ActorInfo {
        id,
        name: name.to_string(),
        avatar: None,
    }
}

pub struct Harness {
    pub hub: Arc<RealtimeHub>,
    pub store: StatusStore,
    pub alerts: Arc<RecordingAlertSink>,
    pub dispatcher: NotificationDispatcher,
    pub triggers: NotificationTriggers,
}

pub fn harness(pool: &PgPool) -> Harness {
    let hub = Arc::new(RealtimeHub::default());
    let store = StatusStore::new(pool.clone(), Arc::clone(&hub));
    let alerts = Arc::new(RecordingAlertSink::default());
    let dispatcher = NotificationDispatcher::new(pool.clone(), alerts.clone());
    let triggers = NotificationTriggers::new(dispatcher.clone(), None, true);
    Harness {
        hub,
        store,
        alerts,
        dispatcher,
        triggers,
    }
}

/// Count a user's notification rows, including read and archived ones.
pub async fn notification_count(pool: &PgPool, user_id: DbId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
