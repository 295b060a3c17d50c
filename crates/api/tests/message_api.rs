//! HTTP-level tests for group messages, receipts and the seen marker.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, get_auth, post_auth, post_json_auth, token_for};
use serde_json::json;
use sqlx::PgPool;
use studybuddy_core::notification::Action;
use studybuddy_db::repositories::NotificationRepo;

async fn send_text(app: axum::Router, group: i64, text: &str, token: &str) -> serde_json::Value {
    let response = post_json_auth(
        app,
        &format!("/api/v1/groups/{group}/messages"),
        json!({ "content": text }),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_members_are_forbidden(pool: PgPool) {
    let member = common::create_user(&pool, "Ana").await;
    let outsider = common::create_user(&pool, "Zed").await;
    let group = common::create_group(&pool, "Chem", &[member]).await;
    let app = common::build_test_app(pool);
    let token = token_for(outsider);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/groups/{group}/messages"),
        json!({ "content": "hi" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(app.clone(), &format!("/api/v1/groups/{group}/messages"), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_auth(app, &format!("/api/v1/groups/{group}/seen"), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn blank_messages_are_rejected(pool: PgPool) {
    let member = common::create_user(&pool, "Ana").await;
    let group = common::create_group(&pool, "Chem", &[member]).await;
    let app = common::build_test_app(pool);

    for content in ["", "   "] {
        let response = post_json_auth(
            app.clone(),
            &format!("/api/v1/groups/{group}/messages"),
            json!({ "content": content }),
            &token_for(member),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

// ---------------------------------------------------------------------------
// Delivery lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn sent_then_delivered_then_seen(pool: PgPool) {
    let ana = common::create_user(&pool, "Ana").await;
    let bo = common::create_user(&pool, "Bo").await;
    let group = common::create_group(&pool, "Chem", &[ana, bo]).await;
    let app = common::build_test_app(pool);

    let message = send_text(app.clone(), group, "Quiz at 5?", &token_for(ana)).await;
    let message_id = message["id"].as_i64().unwrap();
    let receipts_uri = format!("/api/v1/messages/{message_id}/statuses");

    let json = body_json(get_auth(app.clone(), &receipts_uri, &token_for(ana)).await).await;
    assert_eq!(json["data"]["aggregate"], "sent");
    let statuses = json["data"]["statuses"].as_array().unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0]["user_id"], ana);
    assert_eq!(statuses[0]["status"], "sent");
    assert_eq!(statuses[0]["display_name"], "Ana");

    // Bo fetches the page: the message is marked delivered for Bo.
    let page_uri = format!("/api/v1/groups/{group}/messages");
    let json = body_json(get_auth(app.clone(), &page_uri, &token_for(bo)).await).await;
    let page = json["data"].as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["content"], "Quiz at 5?");
    assert!(page[0]["statuses"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s["user_id"] == bo && s["status"] == "delivered"));

    let json = body_json(get_auth(app.clone(), &receipts_uri, &token_for(ana)).await).await;
    assert_eq!(json["data"]["aggregate"], "delivered");

    let seen_uri = format!("/api/v1/groups/{group}/seen");
    let json = body_json(post_auth(app.clone(), &seen_uri, &token_for(bo)).await).await;
    assert_eq!(json["data"]["updated"], 1);

    let json = body_json(get_auth(app.clone(), &receipts_uri, &token_for(ana)).await).await;
    assert_eq!(json["data"]["aggregate"], "seen");

    // Nothing new to mark.
    let json = body_json(post_auth(app, &seen_uri, &token_for(bo)).await).await;
    assert_eq!(json["data"]["updated"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn own_messages_are_never_marked_delivered(pool: PgPool) {
    let ana = common::create_user(&pool, "Ana").await;
    let group = common::create_group(&pool, "Chem", &[ana]).await;
    let app = common::build_test_app(pool);

    send_text(app.clone(), group, "note to self", &token_for(ana)).await;

    let page_uri = format!("/api/v1/groups/{group}/messages");
    let json = body_json(get_auth(app, &page_uri, &token_for(ana)).await).await;
    let statuses = json["data"][0]["statuses"].as_array().unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0]["status"], "sent");
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn reply_notifies_original_sender(pool: PgPool) {
    let ana = common::create_user(&pool, "Ana").await;
    let bo = common::create_user(&pool, "Bo").await;
    let group = common::create_group(&pool, "Chem", &[ana, bo]).await;
    let app = common::build_test_app(pool.clone());

    let original = send_text(app.clone(), group, "Who has the notes?", &token_for(ana)).await;
    let response = post_json_auth(
        app,
        &format!("/api/v1/groups/{group}/messages"),
        json!({ "content": "I do", "reply_to_id": original["id"] }),
        &token_for(bo),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // The trigger runs in the background.
    let mut rows = Vec::new();
    for _ in 0..50 {
        rows = NotificationRepo::list_for_user(&pool, ana, false, false, 10, 0)
            .await
            .unwrap();
        if !rows.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].action, Action::MessageReplied.as_str());
    assert_eq!(rows[0].parsed_metadata().unwrap().preview_text.as_deref(), Some("I do"));

    let own = NotificationRepo::list_for_user(&pool, bo, false, false, 10, 0)
        .await
        .unwrap();
    assert!(own.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reply_to_message_in_other_group_is_not_found(pool: PgPool) {
    let ana = common::create_user(&pool, "Ana").await;
    let chem = common::create_group(&pool, "Chem", &[ana]).await;
    let bio = common::create_group(&pool, "Bio", &[ana]).await;
    let app = common::build_test_app(pool);

    let original = send_text(app.clone(), chem, "chem only", &token_for(ana)).await;
    let response = post_json_auth(
        app,
        &format!("/api/v1/groups/{bio}/messages"),
        json!({ "content": "cross-post", "reply_to_id": original["id"] }),
        &token_for(ana),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
