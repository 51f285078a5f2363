// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Postpilot API Server
//!
//! Generates 7-day social media content calendars with Gemini and
//! publishes posts to Facebook and Instagram via the Meta Graph API.

use postpilot::{
    config::Config,
    db::FirestoreDb,
    services::{
        CloudinaryClient, ConnectService, GeminiClient, IdentityVerifier, MetaClient,
        PublishService,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Postpilot API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.firebase_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Identity verifier for Firebase ID tokens
    let identity = Arc::new(
        IdentityVerifier::new(&config.firebase_project_id)
            .expect("Failed to initialize identity verifier"),
    );

    // Outbound API clients
    let meta = MetaClient::new(config.meta_app_id.clone(), config.meta_app_secret.clone());
    let gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone());
    let cloudinary = CloudinaryClient::new(
        config.cloudinary_cloud_name.clone(),
        config.cloudinary_api_key.clone(),
        config.cloudinary_api_secret.clone(),
    );

    // Services
    let connect = ConnectService::new(meta.clone(), db.clone(), config.meta_page_index);
    let publisher = PublishService::new(meta, db.clone(), config.publish_status_policy);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        identity,
        gemini,
        cloudinary,
        connect,
        publisher,
    });

    // Build router
    let app = postpilot::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("postpilot=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
