// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth routes.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use super::pages::{controller, respond};
use crate::models::OAuthCallback;
use crate::view::{ActionOutcome, Page};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
        .route("/auth/github", get(auth_github))
}

/// Start OAuth flow - redirect to the provider's consent page.
async fn auth_start(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let (controller, gateway) = controller(&state, &jar, Page::Login);
    let outcome = controller.login_with_google().await;

    match outcome {
        ActionOutcome::Failed(e) => login_with_error(e.message()),
        outcome => respond(&state, jar, &gateway, &controller, outcome).await,
    }
}

/// OAuth callback - exchange the token for a session.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<OAuthCallback>,
) -> Response {
    let (controller, gateway) = controller(&state, &jar, Page::Login);
    let outcome = controller.complete_google_login(params).await;

    match outcome {
        ActionOutcome::Failed(e) => {
            tracing::warn!(error = %e, "Google login callback failed");
            login_with_error(e.message())
        }
        outcome => respond(&state, jar, &gateway, &controller, outcome).await,
    }
}

/// GitHub sign-in is offered on the login page but not wired up.
async fn auth_github(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let (controller, _) = controller(&state, &jar, Page::Login);
    match controller.login_with_github() {
        ActionOutcome::Failed(e) => login_with_error(e.message()),
        _ => Redirect::to("/login").into_response(),
    }
}

fn login_with_error(message: &str) -> Response {
    let target = format!("/login?error={}", urlencoding::encode(message));
    Redirect::to(&target).into_response()
}
