// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User-submitted inputs, validated before any backend call.

use serde::Deserialize;
use validator::Validate;

/// Email/password login form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 256, message = "must not be empty"))]
    pub password: String,
}

/// Account creation form.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupForm {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// The backend rejects passwords shorter than 8 characters.
    #[validate(length(min = 8, max = 256, message = "must be 8 to 256 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 128, message = "must be 1 to 128 characters"))]
    pub name: String,
}

/// Query parameters the OAuth provider appends when returning the browser.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCallback {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    /// Present when consent was denied or the provider failed
    #[serde(default)]
    pub error: Option<String>,
}
