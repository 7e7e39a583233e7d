// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Page routes, each served by a view controller.
//!
//! GET renders a page's view model as JSON after the session check, or
//! redirects. POST runs the page's action: success redirects (carrying the
//! new session cookie), failure re-renders the page with its error message.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::redirect_to;
use crate::middleware::auth::{agent_gateway, removal_cookie, session_cookie, SESSION_COOKIE};
use crate::models::{LoginForm, SignupForm, User};
use crate::services::SessionGateway;
use crate::view::{
    ActionOutcome, AuthState, MountOutcome, Page, PendingNavigation, Route, ViewController,
    ViewModel,
};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page).post(submit_login))
        .route("/signup", get(signup_page).post(submit_signup))
        .route("/dashboard", get(dashboard))
        .route("/logout", post(logout))
}

/// User summary shown on the dashboard.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub avatar_fallback: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            display_name: user.display_name().to_string(),
            avatar_url: user.avatar_url().map(str::to_string),
            avatar_fallback: user.avatar_fallback(),
        }
    }
}

/// JSON rendering of a page.
#[derive(Debug, Serialize)]
pub struct PageView {
    pub page: Page,
    pub authenticated: bool,
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserView>,
}

impl From<&ViewModel> for PageView {
    fn from(view: &ViewModel) -> Self {
        let user = match &view.auth {
            AuthState::Authenticated(user) => Some(UserView::from(user)),
            _ => None,
        };
        Self {
            page: view.page,
            authenticated: user.is_some(),
            is_loading: view.is_loading,
            error: view.error.clone(),
            user,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Message passed along by a failed redirect (e.g. OAuth failure)
    #[serde(default)]
    error: Option<String>,
}

/// A controller bound to the requesting agent's session.
pub(crate) fn controller(
    state: &AppState,
    jar: &CookieJar,
    page: Page,
) -> (ViewController, SessionGateway) {
    let gateway = agent_gateway(state, jar);
    let navigator = Arc::new(PendingNavigation::default());
    (ViewController::new(page, gateway.clone(), navigator), gateway)
}

async fn render(state: &AppState, jar: CookieJar, page: Page, error: Option<String>) -> Response {
    let (controller, _) = controller(state, &jar, page);
    if let Some(message) = error.filter(|m| !m.is_empty()) {
        controller.show_error(message);
    }

    let outcome = controller.mount().await;

    // A cookie that no longer maps to a session is dropped.
    let stale = jar.get(SESSION_COOKIE).is_some()
        && matches!(
            outcome,
            MountOutcome::Render(AuthState::Unauthenticated)
                | MountOutcome::Redirected(Route::Login)
        );
    let jar = if stale {
        jar.remove(removal_cookie(state.config.secure_cookies()))
    } else {
        jar
    };

    match outcome {
        MountOutcome::Redirected(route) => (jar, redirect_to(&route)).into_response(),
        _ => (jar, Json(PageView::from(&controller.view()))).into_response(),
    }
}

/// Apply an action's outcome: navigate with the session cookie, or re-render.
pub(crate) async fn respond(
    state: &AppState,
    jar: CookieJar,
    gateway: &SessionGateway,
    controller: &ViewController,
    outcome: ActionOutcome,
) -> Response {
    let secure = state.config.secure_cookies();
    match outcome {
        ActionOutcome::Navigated(route) => {
            let jar = match gateway.session_secret().await {
                Some(secret) => jar.add(session_cookie(secret, secure)),
                None => jar.remove(removal_cookie(secure)),
            };
            (jar, redirect_to(&route)).into_response()
        }
        ActionOutcome::Failed(e) => (
            e.kind().status(),
            Json(PageView::from(&controller.view())),
        )
            .into_response(),
        ActionOutcome::Ignored | ActionOutcome::Detached => StatusCode::CONFLICT.into_response(),
    }
}

async fn home(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    render(&state, jar, Page::Home, None).await
}

async fn login_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<PageQuery>,
) -> Response {
    render(&state, jar, Page::Login, query.error).await
}

async fn signup_page(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    render(&state, jar, Page::Signup, None).await
}

async fn dashboard(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    render(&state, jar, Page::Dashboard, None).await
}

async fn submit_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<LoginForm>,
) -> Response {
    let (controller, gateway) = controller(&state, &jar, Page::Login);
    let outcome = controller.submit_login(&form.email, &form.password).await;
    respond(&state, jar, &gateway, &controller, outcome).await
}

async fn submit_signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(form): Json<SignupForm>,
) -> Response {
    let (controller, gateway) = controller(&state, &jar, Page::Signup);
    let outcome = controller
        .submit_signup(&form.email, &form.password, &form.name)
        .await;
    respond(&state, jar, &gateway, &controller, outcome).await
}

async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let (controller, gateway) = controller(&state, &jar, Page::Dashboard);
    let outcome = controller.logout().await;
    respond(&state, jar, &gateway, &controller, outcome).await
}
