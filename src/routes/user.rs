// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/create", post(create_user))
        .route("/api/user/profile", get(get_profile))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
}

#[derive(Serialize)]
pub struct CreateUserResponse {
    pub success: bool,
    pub message: String,
}

/// Create or update the caller's user document.
///
/// Fields missing from the body fall back to the token claims. Existing
/// Meta connection fields are preserved (fetch-modify-write).
async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut profile = state.db.get_user(&user.uid).await?.unwrap_or_default();

    profile.email = body.email.or(user.email).or(profile.email);
    profile.display_name = body.display_name.or(user.name).or(profile.display_name);
    if profile.created_at.is_none() {
        profile.created_at = Some(now_rfc3339());
    }

    state.db.upsert_user(&user.uid, &profile).await?;

    Ok(Json(CreateUserResponse {
        success: true,
        message: "User document created successfully".to_string(),
    }))
}

/// User profile and connection status, without the access token.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub created_at: Option<String>,
    pub page_id: Option<String>,
    pub page_name: Option<String>,
    pub instagram_business_id: Option<String>,
    pub meta_connected_at: Option<String>,
    pub is_meta_connected: bool,
    pub is_instagram_connected: bool,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserProfile,
}

/// Get the caller's profile and connection status.
///
/// The Meta access token never leaves the server; the response carries
/// boolean connection flags instead.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state
        .db
        .get_user(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let is_meta_connected = profile.is_meta_connected();
    let is_instagram_connected = profile.instagram_business_id.is_some();

    Ok(Json(ProfileResponse {
        success: true,
        user: UserProfile {
            uid: user.uid,
            email: profile.email,
            display_name: profile.display_name,
            created_at: profile.created_at,
            page_id: profile.page_id,
            page_name: profile.page_name,
            instagram_business_id: profile.instagram_business_id,
            meta_connected_at: profile.meta_connected_at,
            is_meta_connected,
            is_instagram_connected,
        },
    }))
}
