// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod gateway;

pub use gateway::{GatewaySettings, OAuthRedirect, SessionGateway, MAX_UPDATE_ATTEMPTS};
