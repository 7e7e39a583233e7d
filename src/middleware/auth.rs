// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie handling and the authentication middleware.

use crate::error::AuthError;
use crate::models::User;
use crate::services::SessionGateway;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

/// Cookie holding the backend session secret.
pub const SESSION_COOKIE: &str = "filevault_session";

/// Authenticated user extracted from the session cookie, together with a
/// gateway bound to that session.
#[derive(Clone)]
pub struct AuthUser {
    pub user: User,
    pub gateway: SessionGateway,
}

/// Gateway bound to the session carried by this request, if any.
pub fn agent_gateway(state: &AppState, jar: &CookieJar) -> SessionGateway {
    let secret = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    state.gateway.for_agent(secret)
}

/// Cookie storing a freshly established session.
pub fn session_cookie(secret: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, secret))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie used to clear the session; attributes match [`session_cookie`].
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    session_cookie(String::new(), secure)
}

/// Middleware that requires a live backend session.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if jar.get(SESSION_COOKIE).is_none() {
        return AuthError::unauthorized("Authentication required").into_response();
    }

    let gateway = agent_gateway(&state, &jar);
    let Some(user) = gateway.get_current_user().await else {
        return AuthError::unauthorized("Session expired or invalid").into_response();
    };

    request.extensions_mut().insert(AuthUser { user, gateway });
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("s3cret".to_string(), true).to_string();
        assert!(cookie.starts_with("filevault_session=s3cret"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_local_cookie_not_secure() {
        let cookie = session_cookie("s3cret".to_string(), false).to_string();
        assert!(!cookie.contains("Secure"));
    }
}
