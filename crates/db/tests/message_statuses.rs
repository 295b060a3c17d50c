//! Integration tests for the message status repository.
//!
//! Covers the strict insert path, idempotent upserts, and the group-wide
//! seen/delivered bulk writes.

use assert_matches::assert_matches;
use sqlx::PgPool;
use studybuddy_core::message_status::DeliveryStatus;
use studybuddy_db::models::group::CreateStudyGroup;
use studybuddy_db::models::message::{CreateMessage, Message};
use studybuddy_db::models::user::CreateUser;
use studybuddy_db::repositories::{
    GroupMemberRepo, MessageRepo, MessageStatusRepo, StudyGroupRepo, UserRepo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn user(pool: &PgPool, name: &str) -> i64 {
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

async fn group(pool: &PgPool, members: &[i64]) -> i64 {
    let group = StudyGroupRepo::create(
        pool,
        &CreateStudyGroup {
            name: "Organic Chemistry".to_string(),
        },
    )
    .await
    .unwrap();
    for member in members {
        GroupMemberRepo::add(pool, group.id, *member).await.unwrap();
    }
    group.id
}

async fn message(pool: &PgPool, group_id: i64, sender_id: i64, content: &str) -> Message {
    MessageRepo::create(
        pool,
        &CreateMessage {
            group_id,
            sender_id,
            content: content.to_string(),
            reply_to_id: None,
        },
    )
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_rejects_duplicate_pair(pool: PgPool) {
    let alice = user(&pool, "Alice").await;
    let group_id = group(&pool, &[alice]).await;
    let msg = message(&pool, group_id, alice, "hello").await;

    MessageStatusRepo::create(&pool, msg.id, alice, DeliveryStatus::Sent)
        .await
        .unwrap();
    let err = MessageStatusRepo::create(&pool, msg.id, alice, DeliveryStatus::Delivered)
        .await
        .unwrap_err();
    assert!(studybuddy_db::is_unique_violation(&err));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upsert_is_idempotent(pool: PgPool) {
    let alice = user(&pool, "Alice").await;
    let bob = user(&pool, "Bob").await;
    let group_id = group(&pool, &[alice, bob]).await;
    let msg = message(&pool, group_id, alice, "hello").await;

    let first = MessageStatusRepo::upsert(&pool, msg.id, bob, DeliveryStatus::Delivered)
        .await
        .unwrap();
    assert!(first.inserted);

    let second = MessageStatusRepo::upsert(&pool, msg.id, bob, DeliveryStatus::Delivered)
        .await
        .unwrap();
    assert!(!second.inserted);
    assert_eq!(second.status.id, first.status.id);

    let rows = MessageStatusRepo::list_for_messages(&pool, &[msg.id]).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_matches!(rows[0].delivery_status(), Ok(DeliveryStatus::Delivered));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upsert_is_last_writer_wins(pool: PgPool) {
    let alice = user(&pool, "Alice").await;
    let bob = user(&pool, "Bob").await;
    let group_id = group(&pool, &[alice, bob]).await;
    let msg = message(&pool, group_id, alice, "hello").await;

    MessageStatusRepo::upsert(&pool, msg.id, bob, DeliveryStatus::Seen)
        .await
        .unwrap();
    let downgraded = MessageStatusRepo::upsert(&pool, msg.id, bob, DeliveryStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(downgraded.status.status, "delivered");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn mark_group_seen_only_touches_existing_rows(pool: PgPool) {
    let alice = user(&pool, "Alice").await;
    let bob = user(&pool, "Bob").await;
    let group_id = group(&pool, &[alice, bob]).await;
    let delivered = message(&pool, group_id, alice, "first").await;
    let untracked = message(&pool, group_id, alice, "second").await;

    MessageStatusRepo::upsert(&pool, delivered.id, bob, DeliveryStatus::Delivered)
        .await
        .unwrap();

    let updated = MessageStatusRepo::mark_group_seen(&pool, group_id, bob).await.unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].message_id, delivered.id);
    assert_eq!(updated[0].status, "seen");

    let missing = MessageStatusRepo::find(&pool, untracked.id, bob).await.unwrap();
    assert!(missing.is_none(), "seen must not synthesize rows");

    let again = MessageStatusRepo::mark_group_seen(&pool, group_id, bob).await.unwrap();
    assert!(again.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn mark_group_delivered_skips_own_and_existing(pool: PgPool) {
    let alice = user(&pool, "Alice").await;
    let bob = user(&pool, "Bob").await;
    let group_id = group(&pool, &[alice, bob]).await;
    let from_alice = message(&pool, group_id, alice, "hi bob").await;
    let already_seen = message(&pool, group_id, alice, "did you see this").await;
    let own = message(&pool, group_id, bob, "hi alice").await;

    MessageStatusRepo::upsert(&pool, already_seen.id, bob, DeliveryStatus::Seen)
        .await
        .unwrap();

    let inserted = MessageStatusRepo::mark_group_delivered(&pool, group_id, bob, None)
        .await
        .unwrap();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].message_id, from_alice.id);

    let seen = MessageStatusRepo::find(&pool, already_seen.id, bob).await.unwrap().unwrap();
    assert_eq!(seen.status, "seen", "existing seen must not be downgraded");
    assert!(MessageStatusRepo::find(&pool, own.id, bob).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn statuses_join_recipient_profiles(pool: PgPool) {
    let alice = user(&pool, "Alice").await;
    let bob = user(&pool, "Bob").await;
    let group_id = group(&pool, &[alice, bob]).await;
    let msg = message(&pool, group_id, alice, "hello").await;

    MessageStatusRepo::create(&pool, msg.id, alice, DeliveryStatus::Sent)
        .await
        .unwrap();
    MessageStatusRepo::upsert(&pool, msg.id, bob, DeliveryStatus::Delivered)
        .await
        .unwrap();

    let rows = MessageStatusRepo::list_for_message_with_profiles(&pool, msg.id)
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.display_name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn group_history_respects_since_and_limit(pool: PgPool) {
    let alice = user(&pool, "Alice").await;
    let group_id = group(&pool, &[alice]).await;
    let old = message(&pool, group_id, alice, "old").await;
    sqlx::query("UPDATE messages SET created_at = NOW() - INTERVAL '2 days' WHERE id = $1")
        .bind(old.id)
        .execute(&pool)
        .await
        .unwrap();
    for text in ["a", "b", "c"] {
        message(&pool, group_id, alice, text).await;
    }

    let since = chrono::Utc::now() - chrono::Duration::days(1);
    let recent = MessageRepo::list_for_group(&pool, group_id, Some(since), 10)
        .await
        .unwrap();
    let texts: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, vec!["a", "b", "c"]);

    let last_two = MessageRepo::list_for_group(&pool, group_id, None, 2).await.unwrap();
    let texts: Vec<&str> = last_two.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, vec!["b", "c"]);
}
