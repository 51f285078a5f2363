// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Publish orchestration for Facebook and Instagram.
//!
//! Given one stored post, validates preconditions, composes the outbound
//! caption, and drives both platform publish sequences. The legs run
//! concurrently and fail independently; the aggregate result is always
//! produced and persisted on the post, even when both legs fail.

use crate::config::PublishStatusPolicy;
use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{LegResult, Post, PostStatus, PublishResult, User};
use crate::services::meta::{ContainerStatus, MetaClient};
use crate::time_utils::now_rfc3339;
use std::time::Duration;

/// First wait between container status checks.
const CONTAINER_POLL_INITIAL: Duration = Duration::from_secs(1);
/// Upper bound for the backoff between container status checks.
const CONTAINER_POLL_MAX_DELAY: Duration = Duration::from_secs(8);
/// Status checks before the Instagram leg gives up.
const CONTAINER_POLL_MAX_ATTEMPTS: u32 = 8;

/// The caller's Meta connection, resolved from the user record.
#[derive(Debug, Clone)]
pub struct MetaConnection {
    pub access_token: String,
    pub page_id: String,
    pub instagram_business_id: Option<String>,
}

/// Resolve the Meta connection from a user record.
///
/// The user record must exist and hold both the access token and the page
/// ID (written atomically by the OAuth callback); anything else means the
/// account is not connected.
pub fn connection_from_user(user: Option<&User>) -> Result<MetaConnection, AppError> {
    let user = user.ok_or(AppError::NotConnected)?;

    match (&user.meta_access_token, &user.page_id) {
        (Some(token), Some(page_id)) => Ok(MetaConnection {
            access_token: token.clone(),
            page_id: page_id.clone(),
            instagram_business_id: user.instagram_business_id.clone(),
        }),
        _ => Err(AppError::NotConnected),
    }
}

/// Validate post-level preconditions and return the post with its
/// publishable image URL.
///
/// Checked in order: existence, ownership, attached image. Each failure is
/// distinct and happens before any outbound call.
pub fn check_post_access(post: Option<Post>, uid: &str) -> Result<(Post, String), AppError> {
    let post = post.ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if post.user_id != uid {
        return Err(AppError::Forbidden);
    }

    let image_url = post.image_url.clone().ok_or(AppError::MissingImage)?;
    Ok((post, image_url))
}

/// Compose the outbound text: caption, blank line, hashtags joined with
/// single spaces in list order.
pub fn compose_caption(caption: &str, hashtags: &[String]) -> String {
    format!("{}\n\n{}", caption, hashtags.join(" "))
}

/// Publish orchestrator.
#[derive(Clone)]
pub struct PublishService {
    meta: MetaClient,
    db: FirestoreDb,
    policy: PublishStatusPolicy,
}

impl PublishService {
    pub fn new(meta: MetaClient, db: FirestoreDb, policy: PublishStatusPolicy) -> Self {
        Self { meta, db, policy }
    }

    /// Publish one post to both platforms.
    ///
    /// Precondition failures abort before any outbound call. Once the legs
    /// run, their outcomes are data: the request succeeds and the post is
    /// updated with the aggregate result regardless of how the legs fared.
    pub async fn publish(&self, uid: &str, post_id: &str) -> Result<PublishResult, AppError> {
        let user = self.db.get_user(uid).await?;
        let connection = connection_from_user(user.as_ref())?;

        let post = self.db.get_post(post_id).await?;
        let (post, image_url) = check_post_access(post, uid)?;

        let message = compose_caption(&post.caption, &post.hashtags);

        tracing::info!(
            uid,
            post_id,
            instagram = connection.instagram_business_id.is_some(),
            "Publishing post"
        );

        let result = self
            .run_legs(
                &connection,
                &image_url,
                &message,
            )
            .await;

        self.persist_result(post_id, post, &result).await?;

        Ok(result)
    }

    /// Run both platform legs concurrently and aggregate their outcomes.
    ///
    /// Neither leg's failure prevents the other's attempt.
    pub async fn run_legs(
        &self,
        connection: &MetaConnection,
        image_url: &str,
        message: &str,
    ) -> PublishResult {
        let (facebook, instagram) = tokio::join!(
            self.facebook_leg(connection, image_url, message),
            self.instagram_leg(connection, image_url, message),
        );

        PublishResult {
            facebook,
            instagram,
        }
    }

    async fn facebook_leg(
        &self,
        connection: &MetaConnection,
        image_url: &str,
        message: &str,
    ) -> LegResult {
        match self
            .meta
            .publish_photo(
                &connection.page_id,
                &connection.access_token,
                image_url,
                message,
            )
            .await
        {
            Ok(platform_post_id) => {
                tracing::info!(platform_post_id = %platform_post_id, "Facebook publish succeeded");
                LegResult::ok(platform_post_id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Facebook publish failed");
                LegResult::failed(leg_error(e))
            }
        }
    }

    async fn instagram_leg(
        &self,
        connection: &MetaConnection,
        image_url: &str,
        message: &str,
    ) -> LegResult {
        let Some(ig_user_id) = connection.instagram_business_id.as_deref() else {
            return LegResult::failed("Instagram not connected to Facebook page");
        };

        match self
            .try_instagram(ig_user_id, &connection.access_token, image_url, message)
            .await
        {
            Ok(platform_post_id) => {
                tracing::info!(platform_post_id = %platform_post_id, "Instagram publish succeeded");
                LegResult::ok(platform_post_id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Instagram publish failed");
                LegResult::failed(leg_error(e))
            }
        }
    }

    /// Instagram's two-step protocol: create a container, wait for the
    /// platform to finish processing it, publish it.
    async fn try_instagram(
        &self,
        ig_user_id: &str,
        access_token: &str,
        image_url: &str,
        message: &str,
    ) -> Result<String, AppError> {
        let creation_id = self
            .meta
            .create_media_container(ig_user_id, access_token, image_url, message)
            .await?;

        self.wait_for_container(&creation_id, access_token).await?;

        self.meta
            .publish_container(ig_user_id, access_token, &creation_id)
            .await
    }

    /// Poll the container's processing status with bounded backoff.
    async fn wait_for_container(
        &self,
        creation_id: &str,
        access_token: &str,
    ) -> Result<(), AppError> {
        let mut delay = CONTAINER_POLL_INITIAL;

        for attempt in 0..CONTAINER_POLL_MAX_ATTEMPTS {
            match self.meta.container_status(creation_id, access_token).await? {
                ContainerStatus::Finished | ContainerStatus::Published => return Ok(()),
                ContainerStatus::Error => {
                    return Err(AppError::MetaApi(
                        "Media container processing failed".to_string(),
                    ));
                }
                ContainerStatus::Expired => {
                    return Err(AppError::MetaApi("Media container expired".to_string()));
                }
                ContainerStatus::InProgress | ContainerStatus::Unknown => {
                    tracing::debug!(creation_id, attempt, "Container still processing");
                }
            }

            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(CONTAINER_POLL_MAX_DELAY);
        }

        Err(AppError::MetaApi(format!(
            "Media container not ready after {} checks",
            CONTAINER_POLL_MAX_ATTEMPTS
        )))
    }

    /// Update the post with the aggregate result.
    ///
    /// The status transition is governed by the configured policy; the
    /// result payload and timestamp are written either way.
    async fn persist_result(
        &self,
        post_id: &str,
        mut post: Post,
        result: &PublishResult,
    ) -> Result<(), AppError> {
        post.status = match self.policy {
            PublishStatusPolicy::AlwaysPosted => PostStatus::Posted,
            PublishStatusPolicy::RequireAnySuccess => {
                if result.any_success() {
                    PostStatus::Posted
                } else {
                    PostStatus::Failed
                }
            }
        };
        let now = now_rfc3339();
        post.posted_at = Some(now.clone());
        post.updated_at = Some(now);
        post.post_results = Some(result.clone());

        self.db.set_post(post_id, &post).await
    }
}

/// Strip the error wrapper so leg results carry the platform message only.
fn leg_error(e: AppError) -> String {
    match e {
        AppError::MetaApi(msg) => msg,
        other => other.to_string(),
    }
}
