// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth callback behavior (no outbound calls in these paths).

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_callback_with_provider_error_redirects_back() {
    let (app, state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/auth/meta/callback?error=access_denied")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    assert!(location.starts_with(&state.config.client_url));
    assert!(location.contains("connected=false"));
    assert!(location.contains("access_denied"));
}

#[tokio::test]
async fn test_callback_missing_code_rejected() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/auth/meta/callback?state=whatever")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_tampered_state_rejected() {
    let (app, _state) = common::create_test_app();

    // Well-formed base64 but not signed with our key
    let bogus_state = {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
        URL_SAFE_NO_PAD.encode(b"uid_1|deadbeef|0000000000000000")
    };

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(&format!(
                    "/auth/meta/callback?code=auth_code&state={}",
                    bogus_state
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
