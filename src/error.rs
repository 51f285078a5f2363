// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Access denied")]
    Forbidden,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Facebook account not connected")]
    NotConnected,

    #[error("Post has no image attached")]
    MissingImage,

    #[error("Meta Graph API error: {0}")]
    MetaApi(String),

    #[error("AI response could not be parsed: {0}")]
    UpstreamParse(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NotConnected => (
                StatusCode::BAD_REQUEST,
                "facebook_not_connected",
                Some("Please connect your Facebook account first".to_string()),
            ),
            AppError::MissingImage => (
                StatusCode::BAD_REQUEST,
                "missing_image",
                Some("Please upload an image before posting".to_string()),
            ),
            AppError::MetaApi(msg) => (StatusCode::BAD_GATEWAY, "meta_error", Some(msg.clone())),
            AppError::UpstreamParse(msg) => {
                (StatusCode::BAD_GATEWAY, "ai_parse_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
