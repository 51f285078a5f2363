// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests (require the emulator).
//!
//! Run with: FIRESTORE_EMULATOR_HOST=localhost:8080 cargo test

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use postpilot::config::PublishStatusPolicy;
use postpilot::error::AppError;
use postpilot::models::{Post, PostStatus, User};
use postpilot::services::{MetaClient, PublishService};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod common;

fn connected_user() -> User {
    User {
        email: Some("owner@example.com".to_string()),
        display_name: Some("Owner".to_string()),
        created_at: Some("2026-01-01T00:00:00Z".to_string()),
        meta_access_token: Some("page_token".to_string()),
        page_id: Some("page_1".to_string()),
        page_name: Some("Test Page".to_string()),
        instagram_business_id: Some("ig_1".to_string()),
        meta_connected_at: Some("2026-01-02T00:00:00Z".to_string()),
    }
}

fn draft_post(uid: &str, image: bool) -> Post {
    Post {
        id: String::new(),
        user_id: uid.to_string(),
        day: 1,
        idea: "Launch teaser".to_string(),
        caption: "Something new is coming.".to_string(),
        hashtags: vec!["#launch".to_string(), "#soon".to_string()],
        status: PostStatus::Draft,
        image_url: image.then(|| "https://img.example/1.jpg".to_string()),
        post_date: None,
        posted_at: None,
        post_results: None,
        created_at: "2026-01-03T00:00:00Z".to_string(),
        updated_at: None,
    }
}

/// Stub Graph server that accepts everything and counts requests.
fn counting_graph(calls: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/{id}/photos",
            post(|State(calls): State<Arc<AtomicUsize>>| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Json(json!({"id": "fb_post_1"}))
            }),
        )
        .route(
            "/{id}/media",
            post(|State(calls): State<Arc<AtomicUsize>>| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Json(json!({"id": "container_1"}))
            }),
        )
        .route(
            "/{id}/media_publish",
            post(|State(calls): State<Arc<AtomicUsize>>| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Json(json!({"id": "ig_post_1"}))
            }),
        )
        .route(
            "/{id}",
            get(|State(calls): State<Arc<AtomicUsize>>| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Json(json!({"status_code": "FINISHED"}))
            }),
        )
        .with_state(calls)
}

async fn publisher_with_stub(
    db: postpilot::db::FirestoreDb,
    calls: Arc<AtomicUsize>,
) -> PublishService {
    let base = common::spawn_stub_server(counting_graph(calls)).await;
    let meta = MetaClient::new("app".to_string(), "secret".to_string()).with_base_url(base);
    PublishService::new(meta, db, PublishStatusPolicy::AlwaysPosted)
}

#[tokio::test]
async fn test_user_round_trip() {
    require_emulator!();
    let db = common::test_db().await;

    let uid = "itest_user_roundtrip";
    assert!(db.get_user(uid).await.unwrap().is_none());

    db.upsert_user(uid, &connected_user()).await.unwrap();

    let stored = db.get_user(uid).await.unwrap().unwrap();
    assert_eq!(stored.page_id.as_deref(), Some("page_1"));
    assert!(stored.is_meta_connected());
}

#[tokio::test]
async fn test_post_crud() {
    require_emulator!();
    let db = common::test_db().await;

    let uid = "itest_post_crud";
    let post = draft_post(uid, false);

    db.set_post("itest_post_1", &post).await.unwrap();

    let stored = db.get_post("itest_post_1").await.unwrap().unwrap();
    assert_eq!(stored.id, "itest_post_1");
    assert_eq!(stored.status, PostStatus::Draft);
    assert!(stored.image_url.is_none());

    db.delete_post("itest_post_1").await.unwrap();
    assert!(db.get_post("itest_post_1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_batch_create_is_atomic_and_queryable() {
    require_emulator!();
    let db = common::test_db().await;

    let uid = "itest_batch_user";
    let posts: Vec<Post> = (1..=7)
        .map(|day| {
            let mut p = draft_post(uid, false);
            p.day = day;
            p
        })
        .collect();

    let ids = db.create_posts_batch(&posts).await.unwrap();
    assert_eq!(ids.len(), 7);

    let stored = db.get_posts_for_user(uid).await.unwrap();
    assert_eq!(stored.len(), 7);
    for post in &stored {
        assert_eq!(post.user_id, uid);
        assert_eq!(post.status, PostStatus::Draft);
    }
}

#[tokio::test]
async fn test_publish_updates_post_with_results() {
    require_emulator!();
    let db = common::test_db().await;

    let uid = "itest_publish_user";
    db.upsert_user(uid, &connected_user()).await.unwrap();
    db.set_post("itest_publish_post", &draft_post(uid, true))
        .await
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let service = publisher_with_stub(db.clone(), calls.clone()).await;

    let result = service.publish(uid, "itest_publish_post").await.unwrap();
    assert!(result.facebook.success);
    assert!(result.instagram.success);

    let stored = db.get_post("itest_publish_post").await.unwrap().unwrap();
    assert_eq!(stored.status, PostStatus::Posted);
    assert!(stored.posted_at.is_some());

    let results = stored.post_results.unwrap();
    assert_eq!(results.facebook.post_id.as_deref(), Some("fb_post_1"));
    assert_eq!(results.instagram.post_id.as_deref(), Some("ig_post_1"));
}

#[tokio::test]
async fn test_publish_missing_image_makes_no_outbound_calls() {
    require_emulator!();
    let db = common::test_db().await;

    let uid = "itest_noimage_user";
    db.upsert_user(uid, &connected_user()).await.unwrap();
    db.set_post("itest_noimage_post", &draft_post(uid, false))
        .await
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let service = publisher_with_stub(db.clone(), calls.clone()).await;

    let result = service.publish(uid, "itest_noimage_post").await;
    assert!(matches!(result, Err(AppError::MissingImage)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // And the post is untouched
    let stored = db.get_post("itest_noimage_post").await.unwrap().unwrap();
    assert_eq!(stored.status, PostStatus::Draft);
    assert!(stored.post_results.is_none());
}

#[tokio::test]
async fn test_publish_foreign_post_is_forbidden() {
    require_emulator!();
    let db = common::test_db().await;

    let owner = "itest_owner_user";
    let intruder = "itest_intruder_user";
    db.upsert_user(owner, &connected_user()).await.unwrap();
    db.upsert_user(intruder, &connected_user()).await.unwrap();
    db.set_post("itest_foreign_post", &draft_post(owner, true))
        .await
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let service = publisher_with_stub(db.clone(), calls.clone()).await;

    let result = service.publish(intruder, "itest_foreign_post").await;
    assert!(matches!(result, Err(AppError::Forbidden)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_publish_not_connected_user() {
    require_emulator!();
    let db = common::test_db().await;

    let uid = "itest_disconnected_user";
    let mut user = connected_user();
    user.meta_access_token = None;
    user.page_id = None;
    db.upsert_user(uid, &user).await.unwrap();
    db.set_post("itest_disconnected_post", &draft_post(uid, true))
        .await
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let service = publisher_with_stub(db.clone(), calls.clone()).await;

    let result = service.publish(uid, "itest_disconnected_post").await;
    assert!(matches!(result, Err(AppError::NotConnected)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
