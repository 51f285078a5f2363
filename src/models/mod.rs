// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod post;
pub mod publish;
pub mod user;

pub use post::{Post, PostStatus};
pub use publish::{LegResult, PublishResult};
pub use user::User;
