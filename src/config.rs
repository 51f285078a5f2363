// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! All third-party credentials (Meta app, Gemini, Cloudinary) are read once
//! at startup and kept in memory for the lifetime of the process.

use std::env;
use std::str::FromStr;

/// Policy for the post status transition after a publish attempt.
///
/// The Graph API legs never fail the publish request itself; this policy
/// decides what `status` the post ends up with based on the leg outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatusPolicy {
    /// Mark the post `posted` unconditionally, even if both legs failed.
    /// Matches the historical behavior of the service.
    AlwaysPosted,
    /// Mark the post `posted` only if at least one leg succeeded,
    /// otherwise mark it `failed`.
    RequireAnySuccess,
}

impl FromStr for PublishStatusPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always-posted" => Ok(Self::AlwaysPosted),
            "require-any-success" => Ok(Self::RequireAnySuccess),
            _ => Err(ConfigError::Invalid("PUBLISH_STATUS_POLICY")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Meta app ID (public)
    pub meta_app_id: String,
    /// Redirect URI registered with the Meta app for the OAuth callback
    pub meta_redirect_uri: String,
    /// Which of the user's Facebook pages to connect (0 = first)
    pub meta_page_index: usize,
    /// Frontend URL for OAuth redirects and CORS
    pub client_url: String,
    /// Firebase project ID (identity audience and Firestore project)
    pub firebase_project_id: String,
    /// Gemini model used for calendar generation
    pub gemini_model: String,
    /// Cloudinary cloud name (public)
    pub cloudinary_cloud_name: String,
    /// Post status policy applied after a publish attempt
    pub publish_status_policy: PublishStatusPolicy,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Meta app secret
    pub meta_app_secret: String,
    /// Gemini API key
    pub gemini_api_key: String,
    /// Cloudinary API key
    pub cloudinary_api_key: String,
    /// Cloudinary API secret (signs uploads)
    pub cloudinary_api_secret: String,
    /// HMAC key for signing the OAuth state parameter (raw bytes)
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            meta_app_id: env::var("META_APP_ID").map_err(|_| ConfigError::Missing("META_APP_ID"))?,
            meta_redirect_uri: env::var("META_REDIRECT_URI")
                .map_err(|_| ConfigError::Missing("META_REDIRECT_URI"))?,
            meta_page_index: env::var("META_PAGE_INDEX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            client_url: env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .map_err(|_| ConfigError::Missing("FIREBASE_PROJECT_ID"))?,
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.0-pro".to_string()),
            cloudinary_cloud_name: env::var("CLOUDINARY_CLOUD_NAME")
                .map_err(|_| ConfigError::Missing("CLOUDINARY_CLOUD_NAME"))?,
            publish_status_policy: match env::var("PUBLISH_STATUS_POLICY") {
                Ok(raw) => raw.trim().parse()?,
                Err(_) => PublishStatusPolicy::AlwaysPosted,
            },
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),

            meta_app_secret: env::var("META_APP_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("META_APP_SECRET"))?,
            gemini_api_key: env::var("GEMINI_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GEMINI_API_KEY"))?,
            cloudinary_api_key: env::var("CLOUDINARY_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CLOUDINARY_API_KEY"))?,
            cloudinary_api_secret: env::var("CLOUDINARY_API_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CLOUDINARY_API_SECRET"))?,
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
        })
    }

    /// Fixed config for tests. Not read from the environment.
    pub fn test_default() -> Self {
        Self {
            meta_app_id: "test_meta_app".to_string(),
            meta_redirect_uri: "http://localhost:5000/auth/meta/callback".to_string(),
            meta_page_index: 0,
            client_url: "http://localhost:3000".to_string(),
            firebase_project_id: "test-project".to_string(),
            gemini_model: "gemini-1.0-pro".to_string(),
            cloudinary_cloud_name: "test-cloud".to_string(),
            publish_status_policy: PublishStatusPolicy::AlwaysPosted,
            port: 5000,
            meta_app_secret: "test_meta_secret".to_string(),
            gemini_api_key: "test_gemini_key".to_string(),
            cloudinary_api_key: "test_cld_key".to_string(),
            cloudinary_api_secret: "test_cld_secret".to_string(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
