// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FileVault: authentication and per-user file storage on top of Appwrite.
//!
//! This crate provides the session gateway over the identity, document and
//! blob services, the per-page view controllers, and the HTTP API that
//! serves them.

pub mod backend;
pub mod config;
pub mod error;
pub mod ids;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod view;

use config::Config;
use services::SessionGateway;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Gateway with no session; requests derive their own via `for_agent`
    pub gateway: SessionGateway,
}
