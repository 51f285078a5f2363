// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Publish attempt results, stored on the post and returned to the caller.

use serde::{Deserialize, Serialize};

/// Outcome of one platform-specific publish attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegResult {
    pub success: bool,
    /// Platform post ID on success
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post_id: Option<String>,
    /// Platform error message on failure
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl LegResult {
    pub fn ok(post_id: String) -> Self {
        Self {
            success: true,
            post_id: Some(post_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            post_id: None,
            error: Some(error.into()),
        }
    }
}

/// Aggregate result of one publish orchestration.
///
/// Always carries both legs; a failed leg is data, not an HTTP error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    pub facebook: LegResult,
    pub instagram: LegResult,
}

impl PublishResult {
    /// Whether at least one platform accepted the post.
    pub fn any_success(&self) -> bool {
        self.facebook.success || self.instagram.success
    }
}
