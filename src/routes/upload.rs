// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image upload route.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Upload size limit (10 MiB).
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/upload",
        post(upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub image_url: String,
    pub public_id: String,
}

/// Upload an image to the media host and return its durable URL.
async fn upload_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut image: Option<(Vec<u8>, Option<String>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("image") {
            let filename = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read image: {}", e)))?;
            image = Some((bytes.to_vec(), filename));
            break;
        }
    }

    let Some((bytes, filename)) = image else {
        return Err(AppError::BadRequest("No image file provided".to_string()));
    };

    let uploaded = state.cloudinary.upload_image(bytes, filename).await?;

    tracing::info!(
        uid = %user.uid,
        public_id = %uploaded.public_id,
        "Image uploaded"
    );

    Ok(Json(UploadResponse {
        success: true,
        image_url: uploaded.secure_url,
        public_id: uploaded.public_id,
    }))
}
