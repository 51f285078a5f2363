// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloudinary client for image hosting.
//!
//! Uploads are signed server-side (SHA-256 over the sorted parameter
//! string plus the API secret) so the client never sees the credentials.

use crate::error::AppError;
use anyhow::anyhow;
use serde::Deserialize;
use sha2::{Digest, Sha256};

const DEFAULT_BASE_URL: &str = "https://api.cloudinary.com";
const UPLOAD_FOLDER: &str = "postpilot";

/// Cloudinary upload API client.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

/// A durably hosted image.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    pub secure_url: String,
    pub public_id: String,
}

impl CloudinaryClient {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cloud_name,
            api_key,
            api_secret,
        }
    }

    /// Override the API base URL (tests point this at a stub server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Upload an image and return its durable URL.
    pub async fn upload_image(
        &self,
        bytes: Vec<u8>,
        filename: Option<String>,
    ) -> Result<UploadedImage, AppError> {
        let url = format!("{}/v1_1/{}/image/upload", self.base_url, self.cloud_name);
        let timestamp = chrono::Utc::now().timestamp();
        let signature = upload_signature(UPLOAD_FOLDER, timestamp, &self.api_secret);

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.unwrap_or_else(|| "image".to_string()));

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("folder", UPLOAD_FOLDER.to_string())
            .text("signature_algorithm", "sha256".to_string())
            .text("signature", signature);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow!("Image upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(anyhow!(
                "Image host returned HTTP {}: {}",
                status,
                body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow!("Image host response parse error: {}", e)))
    }
}

/// Compute the upload signature: SHA-256 over the alphabetically sorted
/// parameter string with the API secret appended.
fn upload_signature(folder: &str, timestamp: i64, api_secret: &str) -> String {
    let to_sign = format!("folder={}&timestamp={}{}", folder, timestamp, api_secret);
    let digest = Sha256::digest(to_sign.as_bytes());
    hex::encode(digest)
}
