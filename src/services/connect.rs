// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meta OAuth connection flow.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::User;
use crate::services::meta::MetaClient;
use crate::time_utils::now_rfc3339;

/// Outcome of a completed OAuth connection.
#[derive(Debug, Clone)]
pub struct ConnectResult {
    pub page_id: String,
    pub page_name: String,
    pub instagram_connected: bool,
}

/// Drives the OAuth callback: token exchanges, page selection, and the
/// single merge-write of the resulting credentials to the user record.
#[derive(Clone)]
pub struct ConnectService {
    client: MetaClient,
    db: FirestoreDb,
    /// Which of the user's pages to connect (0 = first).
    page_index: usize,
}

impl ConnectService {
    pub fn new(client: MetaClient, db: FirestoreDb, page_index: usize) -> Self {
        Self {
            client,
            db,
            page_index,
        }
    }

    /// Handle the OAuth callback for a user.
    ///
    /// Four dependent calls: exchange the code for a short-lived token,
    /// exchange that for a long-lived token, list the user's pages, and
    /// resolve the Instagram business account of the selected page. Failure
    /// at any step aborts the whole flow with nothing persisted; only after
    /// all four succeed is the user record written, so the token and page
    /// ID land atomically.
    pub async fn handle_oauth_callback(
        &self,
        code: &str,
        redirect_uri: &str,
        uid: &str,
    ) -> Result<ConnectResult, AppError> {
        let short_lived = self.client.exchange_code(code, redirect_uri).await?;
        let long_lived = self.client.exchange_long_lived_token(&short_lived).await?;

        let pages = self.client.list_pages(&long_lived).await?;
        let page = pages.get(self.page_index).ok_or_else(|| {
            AppError::BadRequest(
                "No Facebook pages found. Please create a Facebook page first.".to_string(),
            )
        })?;

        // A page without a linked Instagram account is fine; the Graph API
        // reports that as an error for some page setups, so treat any
        // failure here as "not linked".
        let instagram_business_id = match self
            .client
            .instagram_business_account(&page.id, &page.access_token)
            .await
        {
            Ok(ig) => ig,
            Err(e) => {
                tracing::warn!(error = %e, page_id = %page.id, "Instagram account not found for page");
                None
            }
        };

        let mut user = self.db.get_user(uid).await?.unwrap_or_default();
        user.meta_access_token = Some(page.access_token.clone());
        user.page_id = Some(page.id.clone());
        user.page_name = Some(page.name.clone());
        user.instagram_business_id = instagram_business_id.clone();
        user.meta_connected_at = Some(now_rfc3339());

        self.db.upsert_user(uid, &user).await?;

        tracing::info!(
            uid,
            page_id = %page.id,
            page_name = %page.name,
            instagram = instagram_business_id.is_some(),
            "Meta connection stored"
        );

        Ok(ConnectResult {
            page_id: page.id.clone(),
            page_name: page.name.clone(),
            instagram_connected: instagram_business_id.is_some(),
        })
    }
}
