// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.

use crate::error::AppError;
use crate::services::IdentityError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user extracted from a verified ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Middleware that requires a valid identity-provider bearer token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        _ => return Err(AppError::Unauthorized),
    };

    let verified = state.identity.verify(token).await.map_err(|e| match e {
        IdentityError::Unauthorized(msg) => {
            tracing::debug!(error = %msg, "Token verification failed");
            AppError::InvalidToken
        }
        IdentityError::Transient(msg) => {
            AppError::Internal(anyhow::anyhow!("Identity verification unavailable: {}", msg))
        }
    })?;

    let auth_user = AuthUser {
        uid: verified.uid,
        email: verified.email,
        name: verified.name,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
