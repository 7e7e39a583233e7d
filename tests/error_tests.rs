// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use filevault::backend::BackendError;
use filevault::error::{AuthError, ErrorKind};

#[test]
fn test_backend_status_mapping() {
    let cases = [
        (401, ErrorKind::Unauthorized),
        (403, ErrorKind::Unauthorized),
        (404, ErrorKind::NotFound),
        (400, ErrorKind::Validation),
        (409, ErrorKind::Validation),
        (500, ErrorKind::Unknown),
        (503, ErrorKind::Unknown),
    ];

    for (status, kind) in cases {
        let err = AuthError::from_backend(BackendError::api(status, "t", "boom"), "fallback");
        assert_eq!(err.kind(), kind, "status {}", status);
        assert_eq!(err.message(), "boom");
    }
}

#[test]
fn test_network_and_conflict_mapping() {
    let err = AuthError::from_backend(
        BackendError::Network("connection refused".to_string()),
        AuthError::LOGIN_FAILED,
    );
    assert_eq!(err.kind(), ErrorKind::NetworkFailure);

    let err = AuthError::from_backend(BackendError::Conflict, AuthError::UPLOAD_FAILED);
    assert_eq!(err.kind(), ErrorKind::Unknown);
}

#[test]
fn test_empty_backend_message_uses_fallback() {
    let err = AuthError::from_backend(BackendError::api(500, "", "  "), AuthError::DELETE_FAILED);
    assert_eq!(err.message(), AuthError::DELETE_FAILED);
}

#[test]
fn test_error_display_is_message() {
    let err = AuthError::not_found(AuthError::FILE_NOT_FOUND);
    assert_eq!(err.to_string(), "File not found");
}

#[test]
fn test_into_response_status() {
    let cases = [
        (AuthError::not_found("x"), StatusCode::NOT_FOUND),
        (AuthError::unauthorized("x"), StatusCode::UNAUTHORIZED),
        (
            AuthError::new(ErrorKind::NetworkFailure, "x"),
            StatusCode::BAD_GATEWAY,
        ),
        (
            AuthError::new(ErrorKind::Validation, "x"),
            StatusCode::BAD_REQUEST,
        ),
        (
            AuthError::new(ErrorKind::Unknown, "x"),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, status) in cases {
        assert_eq!(err.into_response().status(), status);
    }
}
