// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gateway error type with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::backend::BackendError;

/// Cause of a gateway failure, so callers can branch on more than the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    NetworkFailure,
    Validation,
    Unknown,
}

impl ErrorKind {
    /// HTTP status used when the error reaches a response.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NetworkFailure => StatusCode::BAD_GATEWAY,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NetworkFailure => "network_failure",
            ErrorKind::Validation => "validation",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// Every failure leaving the session gateway.
///
/// The message is always human readable and never empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    kind: ErrorKind,
    message: String,
}

impl AuthError {
    pub const LOGIN_FAILED: &'static str = "Login failed";
    pub const SIGNUP_FAILED: &'static str = "Signup failed";
    pub const GOOGLE_LOGIN_FAILED: &'static str = "Google login failed";
    pub const LOGOUT_FAILED: &'static str = "Logout failed";
    pub const PROFILE_FAILED: &'static str = "Failed to create user document";
    pub const UPLOAD_FAILED: &'static str = "File upload failed";
    pub const DOWNLOAD_FAILED: &'static str = "File download failed";
    pub const DELETE_FAILED: &'static str = "File deletion failed";
    pub const LIST_FAILED: &'static str = "Failed to get files";
    pub const GET_FAILED: &'static str = "Failed to get file";
    pub const FILE_NOT_FOUND: &'static str = "File not found";
    pub const PROFILE_NOT_FOUND: &'static str = "User profile not found";
    pub const PROFILE_READ_FAILED: &'static str = "Failed to get user document";

    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Translate a backend failure, falling back to `fallback` when the
    /// backend supplied no message.
    pub fn from_backend(err: BackendError, fallback: &str) -> Self {
        let kind = match &err {
            BackendError::Api { status, .. } => match status {
                401 | 403 => ErrorKind::Unauthorized,
                404 => ErrorKind::NotFound,
                400 | 409 | 422 => ErrorKind::Validation,
                _ => ErrorKind::Unknown,
            },
            BackendError::Network(_) => ErrorKind::NetworkFailure,
            BackendError::Decode(_) | BackendError::Conflict => ErrorKind::Unknown,
        };

        let message = err.to_string();
        let message = if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        };

        Self { kind, message }
    }

    /// Collapse validator output into a single readable message.
    pub fn from_validation(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reason = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{} {}", field, reason)
            })
            .collect();
        fields.sort();

        Self::new(ErrorKind::Validation, fields.join("; "))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    details: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self.kind {
            ErrorKind::NetworkFailure | ErrorKind::Unknown => {
                tracing::error!(error = %self.message, kind = ?self.kind, "Gateway error");
            }
            _ => tracing::debug!(error = %self.message, kind = ?self.kind, "Request failed"),
        }

        let body = ErrorResponse {
            error: self.kind.code(),
            details: self.message,
        };

        (self.kind.status(), Json(body)).into_response()
    }
}

/// Result type alias for gateway operations and handlers
pub type Result<T> = std::result::Result<T, AuthError>;
