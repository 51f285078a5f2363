// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meta Graph API client for OAuth and publishing.
//!
//! Handles:
//! - OAuth code/token exchange (short-lived and long-lived)
//! - Page listing and Instagram business account resolution
//! - Facebook photo publishing (single call)
//! - Instagram container create / status / publish (two-step protocol)

use crate::error::AppError;
use serde::Deserialize;

const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com/v18.0";

/// Meta Graph API client.
#[derive(Clone)]
pub struct MetaClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_secret: String,
}

impl MetaClient {
    /// Create a new Graph API client with app credentials.
    pub fn new(app_id: String, app_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            app_id,
            app_secret,
        }
    }

    /// Override the Graph API base URL (tests point this at a stub server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    // ─── OAuth ───────────────────────────────────────────────────

    /// Exchange an authorization code for a short-lived user token.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<String, AppError> {
        let url = format!("{}/oauth/access_token", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| AppError::MetaApi(format!("Code exchange request failed: {}", e)))?;

        let token: TokenResponse = self.check_response_json(response).await?;
        Ok(token.access_token)
    }

    /// Exchange a short-lived user token for a long-lived one.
    pub async fn exchange_long_lived_token(
        &self,
        short_lived_token: &str,
    ) -> Result<String, AppError> {
        let url = format!("{}/oauth/access_token", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("grant_type", "fb_exchange_token"),
                ("client_id", self.app_id.as_str()),
                ("client_secret", self.app_secret.as_str()),
                ("fb_exchange_token", short_lived_token),
            ])
            .send()
            .await
            .map_err(|e| AppError::MetaApi(format!("Token exchange request failed: {}", e)))?;

        let token: TokenResponse = self.check_response_json(response).await?;
        Ok(token.access_token)
    }

    /// List the Facebook pages the user manages.
    pub async fn list_pages(&self, user_token: &str) -> Result<Vec<Page>, AppError> {
        let url = format!("{}/me/accounts", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("access_token", user_token)])
            .send()
            .await
            .map_err(|e| AppError::MetaApi(e.to_string()))?;

        let pages: PageList = self.check_response_json(response).await?;
        Ok(pages.data)
    }

    /// Resolve the Instagram business account linked to a page, if any.
    pub async fn instagram_business_account(
        &self,
        page_id: &str,
        page_token: &str,
    ) -> Result<Option<String>, AppError> {
        let url = format!("{}/{}", self.base_url, page_id);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("fields", "instagram_business_account"),
                ("access_token", page_token),
            ])
            .send()
            .await
            .map_err(|e| AppError::MetaApi(e.to_string()))?;

        let body: IgAccountResponse = self.check_response_json(response).await?;
        Ok(body.instagram_business_account.map(|acct| acct.id))
    }

    // ─── Facebook Publishing ─────────────────────────────────────

    /// Publish a photo to a Facebook page. Returns the platform post ID.
    pub async fn publish_photo(
        &self,
        page_id: &str,
        access_token: &str,
        image_url: &str,
        caption: &str,
    ) -> Result<String, AppError> {
        let url = format!("{}/{}/photos", self.base_url, page_id);

        let body = serde_json::json!({
            "url": image_url,
            "caption": caption,
            "access_token": access_token,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::MetaApi(e.to_string()))?;

        let created: ObjectId = self.check_response_json(response).await?;
        Ok(created.id)
    }

    // ─── Instagram Publishing ────────────────────────────────────

    /// Create an Instagram media container. Returns the creation ID.
    pub async fn create_media_container(
        &self,
        ig_user_id: &str,
        access_token: &str,
        image_url: &str,
        caption: &str,
    ) -> Result<String, AppError> {
        let url = format!("{}/{}/media", self.base_url, ig_user_id);

        let body = serde_json::json!({
            "image_url": image_url,
            "caption": caption,
            "access_token": access_token,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::MetaApi(e.to_string()))?;

        let created: ObjectId = self.check_response_json(response).await?;
        Ok(created.id)
    }

    /// Get the processing status of a media container.
    pub async fn container_status(
        &self,
        creation_id: &str,
        access_token: &str,
    ) -> Result<ContainerStatus, AppError> {
        let url = format!("{}/{}", self.base_url, creation_id);

        let response = self
            .http
            .get(&url)
            .query(&[("fields", "status_code"), ("access_token", access_token)])
            .send()
            .await
            .map_err(|e| AppError::MetaApi(e.to_string()))?;

        let body: ContainerStatusResponse = self.check_response_json(response).await?;
        Ok(body.status_code.parse().unwrap_or(ContainerStatus::Unknown))
    }

    /// Publish a processed media container. Returns the platform post ID.
    pub async fn publish_container(
        &self,
        ig_user_id: &str,
        access_token: &str,
        creation_id: &str,
    ) -> Result<String, AppError> {
        let url = format!("{}/{}/media_publish", self.base_url, ig_user_id);

        let body = serde_json::json!({
            "creation_id": creation_id,
            "access_token": access_token,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::MetaApi(e.to_string()))?;

        let created: ObjectId = self.check_response_json(response).await?;
        Ok(created.id)
    }

    /// Check response and parse JSON body, extracting Graph error messages.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            let message = extract_graph_error(&body)
                .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

            return Err(AppError::MetaApi(message));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::MetaApi(format!("JSON parse error: {}", e)))
    }
}

/// Pull the human-readable message out of a Graph API error body.
fn extract_graph_error(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

/// OAuth token response.
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// A Facebook page the user manages.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    pub name: String,
    /// Page-scoped access token, used for all publishing calls
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PageList {
    #[serde(default)]
    data: Vec<Page>,
}

#[derive(Debug, Clone, Deserialize)]
struct IgAccountResponse {
    instagram_business_account: Option<ObjectId>,
}

#[derive(Debug, Clone, Deserialize)]
struct ObjectId {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ContainerStatusResponse {
    status_code: String,
}

/// Instagram container processing states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Finished,
    InProgress,
    Error,
    Expired,
    Published,
    Unknown,
}

impl std::str::FromStr for ContainerStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "FINISHED" => Self::Finished,
            "IN_PROGRESS" => Self::InProgress,
            "ERROR" => Self::Error,
            "EXPIRED" => Self::Expired,
            "PUBLISHED" => Self::Published,
            _ => Self::Unknown,
        })
    }
}
