// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile stored in Firestore, keyed by the Firebase uid.
///
/// Field names are camelCase on the wire because the SPA subscribes to
/// these documents directly through the Firestore client SDK.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Email address (may be None if not shared)
    pub email: Option<String>,
    /// Display name from the identity provider or the create call
    pub display_name: Option<String>,
    /// When the user document was first created
    pub created_at: Option<String>,
    /// Long-lived page access token for the Meta Graph API.
    /// Present iff the user completed the OAuth flow; never sent to clients.
    pub meta_access_token: Option<String>,
    /// Connected Facebook page ID. Set together with `meta_access_token`.
    pub page_id: Option<String>,
    /// Connected Facebook page name
    pub page_name: Option<String>,
    /// Instagram business account linked to the page, if any
    pub instagram_business_id: Option<String>,
    /// When the Meta connection was established (ISO 8601)
    pub meta_connected_at: Option<String>,
}

impl User {
    /// Whether the user has a usable Meta connection.
    ///
    /// `meta_access_token` and `page_id` are written atomically by the
    /// OAuth callback, so either both are present or neither is.
    pub fn is_meta_connected(&self) -> bool {
        self.meta_access_token.is_some() && self.page_id.is_some()
    }
}
