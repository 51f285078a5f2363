// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Publish leg behavior against a stub Graph API server.
//!
//! The legs run without any database access here; the orchestrator's
//! precondition checks are covered by unit tests next to the service.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use postpilot::config::PublishStatusPolicy;
use postpilot::db::FirestoreDb;
use postpilot::services::publish::MetaConnection;
use postpilot::services::{MetaClient, PublishService};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod common;

fn publisher(base_url: &str) -> PublishService {
    let meta =
        MetaClient::new("app".to_string(), "secret".to_string()).with_base_url(base_url);
    PublishService::new(
        meta,
        FirestoreDb::new_mock(),
        PublishStatusPolicy::AlwaysPosted,
    )
}

fn connection(instagram: bool) -> MetaConnection {
    MetaConnection {
        access_token: "page_token".to_string(),
        page_id: "page_1".to_string(),
        instagram_business_id: instagram.then(|| "ig_1".to_string()),
    }
}

/// Stub server where both platforms accept the post.
fn happy_graph() -> Router {
    Router::new()
        .route(
            "/{id}/photos",
            post(|| async { Json(json!({"id": "fb_post_1"})) }),
        )
        .route(
            "/{id}/media",
            post(|| async { Json(json!({"id": "container_1"})) }),
        )
        .route(
            "/{id}/media_publish",
            post(|| async { Json(json!({"id": "ig_post_1"})) }),
        )
        .route(
            "/{id}",
            get(|| async { Json(json!({"status_code": "FINISHED"})) }),
        )
}

#[tokio::test]
async fn test_both_legs_succeed() {
    let base = common::spawn_stub_server(happy_graph()).await;
    let service = publisher(&base);

    let result = service
        .run_legs(&connection(true), "https://img.example/1.jpg", "Hello\n\n#a")
        .await;

    assert!(result.facebook.success);
    assert_eq!(result.facebook.post_id.as_deref(), Some("fb_post_1"));
    assert!(result.instagram.success);
    assert_eq!(result.instagram.post_id.as_deref(), Some("ig_post_1"));
}

#[tokio::test]
async fn test_facebook_failure_does_not_abort_instagram() {
    let app = Router::new()
        .route(
            "/{id}/photos",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": {"message": "Invalid OAuth access token."}})),
                )
            }),
        )
        .route(
            "/{id}/media",
            post(|| async { Json(json!({"id": "container_1"})) }),
        )
        .route(
            "/{id}/media_publish",
            post(|| async { Json(json!({"id": "ig_post_1"})) }),
        )
        .route(
            "/{id}",
            get(|| async { Json(json!({"status_code": "FINISHED"})) }),
        );

    let base = common::spawn_stub_server(app).await;
    let service = publisher(&base);

    let result = service
        .run_legs(&connection(true), "https://img.example/1.jpg", "Hello")
        .await;

    assert!(!result.facebook.success);
    assert_eq!(
        result.facebook.error.as_deref(),
        Some("Invalid OAuth access token.")
    );
    assert!(result.instagram.success);
    assert!(result.any_success());
}

#[tokio::test]
async fn test_instagram_failure_does_not_abort_facebook() {
    let app = Router::new()
        .route(
            "/{id}/photos",
            post(|| async { Json(json!({"id": "fb_post_1"})) }),
        )
        .route(
            "/{id}/media",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": {"message": "Media type unsupported."}})),
                )
            }),
        );

    let base = common::spawn_stub_server(app).await;
    let service = publisher(&base);

    let result = service
        .run_legs(&connection(true), "https://img.example/1.jpg", "Hello")
        .await;

    assert!(result.facebook.success);
    assert!(!result.instagram.success);
    assert_eq!(
        result.instagram.error.as_deref(),
        Some("Media type unsupported.")
    );
}

#[tokio::test]
async fn test_no_instagram_account_short_circuits_leg() {
    let ig_calls = Arc::new(AtomicUsize::new(0));

    let app = Router::new()
        .route(
            "/{id}/photos",
            post(|| async { Json(json!({"id": "fb_post_1"})) }),
        )
        .route(
            "/{id}/media",
            post(|State(calls): State<Arc<AtomicUsize>>| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Json(json!({"id": "container_1"}))
            }),
        )
        .with_state(ig_calls.clone());

    let base = common::spawn_stub_server(app).await;
    let service = publisher(&base);

    let result = service
        .run_legs(&connection(false), "https://img.example/1.jpg", "Hello")
        .await;

    assert!(result.facebook.success);
    assert!(!result.instagram.success);
    assert_eq!(
        result.instagram.error.as_deref(),
        Some("Instagram not connected to Facebook page")
    );
    assert_eq!(ig_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_container_readiness_is_polled() {
    let status_calls = Arc::new(AtomicUsize::new(0));

    let app = Router::new()
        .route(
            "/{id}/photos",
            post(|| async { Json(json!({"id": "fb_post_1"})) }),
        )
        .route(
            "/{id}/media",
            post(|| async { Json(json!({"id": "container_1"})) }),
        )
        .route(
            "/{id}/media_publish",
            post(|| async { Json(json!({"id": "ig_post_1"})) }),
        )
        .route(
            "/{id}",
            get(|State(calls): State<Arc<AtomicUsize>>| async move {
                // Not ready on the first check, ready on the second.
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Json(json!({"status_code": "IN_PROGRESS"}))
                } else {
                    Json(json!({"status_code": "FINISHED"}))
                }
            }),
        )
        .with_state(status_calls.clone());

    let base = common::spawn_stub_server(app).await;
    let service = publisher(&base);

    let result = service
        .run_legs(&connection(true), "https://img.example/1.jpg", "Hello")
        .await;

    assert!(result.instagram.success);
    assert_eq!(status_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_container_error_fails_instagram_leg() {
    let app = Router::new()
        .route(
            "/{id}/photos",
            post(|| async { Json(json!({"id": "fb_post_1"})) }),
        )
        .route(
            "/{id}/media",
            post(|| async { Json(json!({"id": "container_1"})) }),
        )
        .route(
            "/{id}",
            get(|| async { Json(json!({"status_code": "ERROR"})) }),
        );

    let base = common::spawn_stub_server(app).await;
    let service = publisher(&base);

    let result = service
        .run_legs(&connection(true), "https://img.example/1.jpg", "Hello")
        .await;

    assert!(result.facebook.success);
    assert!(!result.instagram.success);
    assert_eq!(
        result.instagram.error.as_deref(),
        Some("Media container processing failed")
    );
}
