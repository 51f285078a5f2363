// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cloudinary;
pub mod connect;
pub mod gemini;
pub mod identity;
pub mod meta;
pub mod publish;

pub use cloudinary::{CloudinaryClient, UploadedImage};
pub use connect::ConnectService;
pub use gemini::GeminiClient;
pub use identity::{IdentityError, IdentityVerifier, VerifiedUser};
pub use meta::MetaClient;
pub use publish::PublishService;
