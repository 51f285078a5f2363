// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Content-calendar generation route.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::routes::post::PostWithId;
use crate::services::gemini::{build_calendar_prompt, parse_calendar, to_draft_posts};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/gemini/generate-calendar", post(generate_calendar))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCalendarRequest {
    #[validate(length(min = 1, max = 500))]
    pub business_idea: String,
}

#[derive(Serialize)]
pub struct GenerateCalendarResponse {
    pub success: bool,
    pub message: String,
    pub posts: Vec<PostWithId>,
}

/// Generate a 7-day content calendar and store it as draft posts.
///
/// The model reply is parsed and shape-checked before anything is written;
/// the 7 drafts then go into the store as one atomic batch.
async fn generate_calendar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<GenerateCalendarRequest>,
) -> Result<Json<GenerateCalendarResponse>> {
    body.validate()
        .map_err(|_| AppError::BadRequest("Business idea is required".to_string()))?;

    let prompt = build_calendar_prompt(&body.business_idea);

    let raw_text = state.gemini.generate_content(&prompt).await?;
    let entries = parse_calendar(&raw_text)?;

    tracing::info!(
        uid = %user.uid,
        count = entries.len(),
        "Calendar generated, storing drafts"
    );

    let mut posts = to_draft_posts(&user.uid, entries, &now_rfc3339());
    let ids = state.db.create_posts_batch(&posts).await?;

    for (post, id) in posts.iter_mut().zip(ids) {
        post.id = id;
    }

    Ok(Json(GenerateCalendarResponse {
        success: true,
        message: format!("Generated {} posts", posts.len()),
        posts: posts.into_iter().map(PostWithId::from).collect(),
    }))
}
