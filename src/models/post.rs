// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar post model for storage and API.

use crate::models::PublishResult;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a calendar post.
///
/// `failed` is only reachable under the `require-any-success` publish
/// status policy; the default policy never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Posted,
    Failed,
}

/// Stored calendar post in Firestore.
///
/// Created in a batch of exactly 7 (one per day) when a calendar is
/// generated, then mutated by image upload, scheduling, and publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Firestore document ID. Populated on reads, never written back.
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: String,
    /// Firebase uid of the owner; every access checks this
    pub user_id: String,
    /// Calendar day (1-7)
    pub day: u32,
    /// One-line content idea
    pub idea: String,
    /// Post caption
    pub caption: String,
    /// Hashtags, in publish order (each including the leading '#')
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub status: PostStatus,
    /// Attached image; publishing is blocked while None
    pub image_url: Option<String>,
    /// Scheduled publish date (ISO 8601), if scheduled
    pub post_date: Option<String>,
    /// When the post was published
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub posted_at: Option<String>,
    /// Per-platform results of the last publish attempt
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post_results: Option<PublishResult>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<String>,
}
