// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post routes: listing, editing, deleting, and publishing.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Post, PostStatus, PublishResult};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/post/my-posts", get(my_posts))
        .route("/api/post/now", post(publish_now))
        .route("/api/post/{id}", patch(update_post).delete(delete_post))
}

/// A stored post together with its document ID, as returned to clients.
#[derive(Serialize)]
pub struct PostWithId {
    pub id: String,
    #[serde(flatten)]
    pub post: Post,
}

impl From<Post> for PostWithId {
    fn from(post: Post) -> Self {
        Self {
            id: post.id.clone(),
            post,
        }
    }
}

#[derive(Serialize)]
pub struct PostsResponse {
    pub success: bool,
    pub posts: Vec<PostWithId>,
}

/// Get all posts for the authenticated user, newest first.
async fn my_posts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PostsResponse>> {
    let posts = state.db.get_posts_for_user(&user.uid).await?;

    Ok(Json(PostsResponse {
        success: true,
        posts: posts.into_iter().map(PostWithId::from).collect(),
    }))
}

/// Partial update of an owned post.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub idea: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
    pub image_url: Option<String>,
    pub post_date: Option<String>,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

/// Update a post (e.g. attach an image URL, schedule it).
async fn update_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Json(updates): Json<UpdatePostRequest>,
) -> Result<Json<SuccessResponse>> {
    let mut post = owned_post(&state, &post_id, &user.uid).await?;

    if let Some(idea) = updates.idea {
        post.idea = idea;
    }
    if let Some(caption) = updates.caption {
        post.caption = caption;
    }
    if let Some(hashtags) = updates.hashtags {
        post.hashtags = hashtags;
    }
    if let Some(status) = updates.status {
        post.status = status;
    }
    if let Some(image_url) = updates.image_url {
        post.image_url = Some(image_url);
    }
    if let Some(post_date) = updates.post_date {
        post.post_date = Some(post_date);
    }
    post.updated_at = Some(now_rfc3339());

    state.db.set_post(&post_id, &post).await?;

    Ok(Json(SuccessResponse {
        success: true,
        message: "Post updated successfully".to_string(),
    }))
}

/// Delete an owned post.
async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    owned_post(&state, &post_id, &user.uid).await?;

    state.db.delete_post(&post_id).await?;

    tracing::info!(uid = %user.uid, post_id = %post_id, "Post deleted");

    Ok(Json(SuccessResponse {
        success: true,
        message: "Post deleted successfully".to_string(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishNowRequest {
    #[serde(default)]
    pub post_id: Option<String>,
}

#[derive(Serialize)]
pub struct PublishNowResponse {
    pub success: bool,
    pub message: String,
    pub results: PublishResult,
}

/// Publish a post to Facebook and Instagram.
///
/// Responds with success whenever the preconditions pass; per-platform
/// failures are carried in `results`, not as an HTTP error.
async fn publish_now(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<PublishNowRequest>,
) -> Result<Json<PublishNowResponse>> {
    let post_id = body
        .post_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Post ID is required".to_string()))?;

    let results = state.publisher.publish(&user.uid, &post_id).await?;

    Ok(Json(PublishNowResponse {
        success: true,
        message: "Post published".to_string(),
        results,
    }))
}

/// Fetch a post and verify the caller owns it.
async fn owned_post(state: &AppState, post_id: &str, uid: &str) -> Result<Post> {
    let post = state
        .db
        .get_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if post.user_id != uid {
        return Err(AppError::Forbidden);
    }

    Ok(post)
}
