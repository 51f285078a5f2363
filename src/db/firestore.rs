// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile and Meta connection state)
//! - Posts (generated calendar entries)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Post, User};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};

/// Raw random bytes per generated post ID (20 base64url chars).
const POST_ID_BYTES: usize = 15;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by their Firebase uid.
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a user document.
    ///
    /// Merge semantics are handled by callers: fetch, modify the fields
    /// being changed, then write the whole document back.
    pub async fn upsert_user(&self, uid: &str, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Post Operations ─────────────────────────────────────────

    /// Get a post by document ID.
    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::POSTS)
            .obj()
            .one(post_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a post document.
    pub async fn set_post(&self, post_id: &str, post: &Post) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::POSTS)
            .document_id(post_id)
            .object(post)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a post document.
    pub async fn delete_post(&self, post_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::POSTS)
            .document_id(post_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get all posts owned by a user, newest first.
    pub async fn get_posts_for_user(&self, uid: &str) -> Result<Vec<Post>, AppError> {
        let uid = uid.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::POSTS)
            .filter(move |q| q.field("userId").eq(uid.clone()))
            .order_by([(
                "createdAt",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a batch of posts atomically (all-or-nothing).
    ///
    /// Document IDs are generated client-side so the whole batch can go
    /// through one transaction. Returns the generated IDs in input order.
    pub async fn create_posts_batch(&self, posts: &[Post]) -> Result<Vec<String>, AppError> {
        let client = self.get_client()?;

        let ids: Vec<String> = posts
            .iter()
            .map(|_| generate_post_id())
            .collect::<Result<_, _>>()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for (post, doc_id) in posts.iter().zip(&ids) {
            client
                .fluent()
                .update()
                .in_col(collections::POSTS)
                .document_id(doc_id)
                .object(post)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add post to transaction: {}", e))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(count = posts.len(), "Post batch stored atomically");

        Ok(ids)
    }
}

/// Generate a random Firestore-style document ID.
fn generate_post_id() -> Result<String, AppError> {
    let mut bytes = [0u8; POST_ID_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Random ID generation failed")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
