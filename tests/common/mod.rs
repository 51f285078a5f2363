// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use postpilot::config::Config;
use postpilot::db::FirestoreDb;
use postpilot::routes::create_router;
use postpilot::services::{
    CloudinaryClient, ConnectService, GeminiClient, IdentityVerifier, MetaClient, PublishService,
};
use postpilot::AppState;
use std::sync::Arc;

/// Shared HMAC key for test identity tokens.
pub const TEST_IDENTITY_KEY: &[u8] = b"test_identity_key_32_bytes_long!";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Base URL overrides for outbound clients.
#[derive(Default)]
pub struct TestClientUrls {
    pub meta: Option<String>,
    pub gemini: Option<String>,
    pub cloudinary: Option<String>,
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(TestClientUrls::default())
}

/// Create a test app, pointing outbound clients at stub servers.
#[allow(dead_code)]
pub fn create_test_app_with(urls: TestClientUrls) -> (axum::Router, Arc<AppState>) {
    create_test_app_with_db(urls, test_db_offline())
}

/// Create a test app with an explicit database (e.g. the emulator).
#[allow(dead_code)]
pub fn create_test_app_with_db(
    urls: TestClientUrls,
    db: FirestoreDb,
) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();

    let identity = Arc::new(IdentityVerifier::new_with_static_hmac(
        &config.firebase_project_id,
        TEST_IDENTITY_KEY,
    ));

    let mut meta = MetaClient::new(config.meta_app_id.clone(), config.meta_app_secret.clone());
    if let Some(base) = urls.meta {
        meta = meta.with_base_url(base);
    }

    let mut gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone());
    if let Some(base) = urls.gemini {
        gemini = gemini.with_base_url(base);
    }

    let mut cloudinary = CloudinaryClient::new(
        config.cloudinary_cloud_name.clone(),
        config.cloudinary_api_key.clone(),
        config.cloudinary_api_secret.clone(),
    );
    if let Some(base) = urls.cloudinary {
        cloudinary = cloudinary.with_base_url(base);
    }

    let connect = ConnectService::new(meta.clone(), db.clone(), config.meta_page_index);
    let publisher = PublishService::new(meta, db.clone(), config.publish_status_policy);

    let state = Arc::new(AppState {
        config,
        db,
        identity,
        gemini,
        cloudinary,
        connect,
        publisher,
    });

    (create_router(state.clone()), state)
}

/// Create a signed HS256 identity token accepted by the test verifier.
#[allow(dead_code)]
pub fn create_test_token(uid: &str) -> String {
    create_test_token_with_expiry(uid, 3600)
}

/// Create a test token with a relative expiry (negative = already expired).
#[allow(dead_code)]
pub fn create_test_token_with_expiry(uid: &str, expires_in_secs: i64) -> String {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    #[derive(serde::Serialize)]
    struct Claims {
        sub: String,
        iss: String,
        aud: String,
        exp: usize,
        iat: usize,
        email: Option<String>,
        name: Option<String>,
    }

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: uid.to_string(),
        iss: "https://securetoken.google.com/test-project".to_string(),
        aud: "test-project".to_string(),
        exp: (now + expires_in_secs) as usize,
        iat: now as usize,
        email: Some("owner@example.com".to_string()),
        name: Some("Test Owner".to_string()),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_IDENTITY_KEY),
    )
    .expect("test token encoding")
}

/// Spawn a stub HTTP server for outbound clients; returns its base URL.
#[allow(dead_code)]
pub async fn spawn_stub_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub server");
    let addr = listener.local_addr().expect("stub server addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    format!("http://{}", addr)
}
