// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Postpilot: AI-assisted social media calendar and publishing API
//!
//! This crate provides the backend for generating 7-day content calendars
//! with Gemini, storing and editing the resulting posts, and publishing
//! them to Facebook and Instagram through the Meta Graph API.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{CloudinaryClient, ConnectService, GeminiClient, IdentityVerifier, PublishService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: Arc<IdentityVerifier>,
    pub gemini: GeminiClient,
    pub cloudinary: CloudinaryClient,
    pub connect: ConnectService,
    pub publisher: PublishService,
}
