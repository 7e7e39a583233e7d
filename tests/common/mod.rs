// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use filevault::backend::MemoryBackend;
use filevault::config::Config;
use filevault::routes::create_router;
use filevault::services::SessionGateway;
use filevault::AppState;
use std::sync::Arc;

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "correct-horse";
pub const NAME: &str = "Ada Lovelace";

/// Gateway over a fresh in-memory backend.
#[allow(dead_code)]
pub fn test_gateway() -> (SessionGateway, Arc<MemoryBackend>) {
    let config = Config::test_default();
    let backend = Arc::new(MemoryBackend::new());
    let gateway = SessionGateway::with_backend(backend.clone(), (&config).into());
    (gateway, backend)
}

/// Gateway with an account already signed up (and signed in).
#[allow(dead_code)]
pub async fn signed_up_gateway() -> (SessionGateway, Arc<MemoryBackend>, String) {
    let (gateway, backend) = test_gateway();
    let user = gateway
        .signup(EMAIL, PASSWORD, NAME)
        .await
        .expect("signup should succeed");
    (gateway, backend, user.id)
}

/// Create a test app over the in-memory backend.
/// Returns the router, the shared state and the backend.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryBackend>) {
    let config = Config::test_default();
    let backend = Arc::new(MemoryBackend::new());
    let gateway = SessionGateway::with_backend(backend.clone(), (&config).into());

    let state = Arc::new(AppState { config, gateway });
    (create_router(state.clone()), state, backend)
}

/// `name=value` of the session cookie set by a response, if any.
#[allow(dead_code)]
pub fn session_cookie<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("filevault_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

#[allow(dead_code)]
pub fn location<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn get_with_cookie(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
