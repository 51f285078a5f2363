// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meta OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

const FACEBOOK_DIALOG_URL: &str = "https://www.facebook.com/v18.0/dialog/oauth";
const OAUTH_SCOPES: &str = "pages_show_list,pages_manage_posts,instagram_basic,instagram_content_publish,pages_read_engagement";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/meta/connect_start", get(connect_start))
        .route("/auth/meta/callback", get(callback))
}

/// Query parameters for starting the OAuth flow.
#[derive(Deserialize)]
pub struct ConnectStartParams {
    /// The caller's uid, carried through the flow as signed state.
    uid: String,
}

/// Start OAuth flow - redirect to the Meta authorization dialog.
///
/// No server-side state is created; the uid travels inside an HMAC-signed
/// state parameter so the callback can attribute the connection.
async fn connect_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConnectStartParams>,
) -> Result<Redirect> {
    if params.uid.trim().is_empty() {
        return Err(AppError::BadRequest("User ID is required".to_string()));
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let oauth_state = sign_state(&params.uid, timestamp, &state.config.oauth_state_key)?;

    let auth_url = format!(
        "{}?client_id={}&redirect_uri={}&scope={}&state={}",
        FACEBOOK_DIALOG_URL,
        state.config.meta_app_id,
        urlencoding::encode(&state.config.meta_redirect_uri),
        urlencoding::encode(OAUTH_SCOPES),
        oauth_state
    );

    tracing::info!(uid = %params.uid, "Starting Meta OAuth flow");

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange the code, store credentials, redirect back.
async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Meta");
        let redirect = format!("{}/dashboard?connected=false&error={}", state.config.client_url, urlencoding::encode(&error));
        return Ok(Redirect::temporary(&redirect));
    }

    let (Some(code), Some(raw_state)) = (params.code, params.state) else {
        return Err(AppError::BadRequest(
            "Authorization failed. Missing code or user ID.".to_string(),
        ));
    };

    // The state carries the uid; a bad signature means we cannot attribute
    // the connection to anyone, so this is a hard failure.
    let uid = verify_and_decode_state(&raw_state, &state.config.oauth_state_key)
        .ok_or_else(|| AppError::BadRequest("Invalid or tampered state parameter".to_string()))?;

    tracing::info!(uid = %uid, "Exchanging authorization code for tokens");

    let result = state
        .connect
        .handle_oauth_callback(&code, &state.config.meta_redirect_uri, &uid)
        .await?;

    tracing::info!(
        uid = %uid,
        page_name = %result.page_name,
        instagram = result.instagram_connected,
        "Meta OAuth successful"
    );

    let redirect_url = format!("{}/dashboard?connected=true", state.config.client_url);
    Ok(Redirect::temporary(&redirect_url))
}

/// Sign the uid + timestamp into a base64url state parameter.
fn sign_state(uid: &str, timestamp: u128, secret: &[u8]) -> Result<String> {
    // Create the data payload: "uid|timestamp_hex"
    let state_payload = format!("{}|{:x}", uid, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(state_payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    // Combine payload + signature: "payload|signature_hex"
    let signed_state = format!("{}|{}", state_payload, hex::encode(signature));

    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Verify HMAC signature and decode the uid from the OAuth state parameter.
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "uid|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let uid = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    // Reconstruct payload and verify signature
    let payload = format!("{}|{}", uid, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(uid.to_string())
}
