// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-page view controllers.
//!
//! A controller checks the session when its page mounts, then either
//! navigates away or renders. User actions go through the gateway; while one
//! is in flight the controller is busy and further actions are ignored.
//!
//! The controller owns its view state. Pending checks and actions only hold a
//! weak reference to it, so a result arriving after the controller was
//! dropped (the page was left) is discarded instead of updating dead state.

use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::error::{AuthError, ErrorKind, Result};
use crate::models::{OAuthCallback, User};
use crate::services::SessionGateway;

pub const GOOGLE_LOGIN_ERROR: &str = "Google login failed. Please try again.";
pub const GITHUB_NOT_IMPLEMENTED: &str = "GitHub login is not implemented yet.";

/// Navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Signup,
    Dashboard,
    /// Off-site location, e.g. an OAuth consent page
    External(String),
}

impl Route {
    pub fn path(&self) -> &str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Dashboard => "/dashboard",
            Route::External(url) => url,
        }
    }
}

/// Performs navigation on behalf of a controller.
pub trait Navigator: Send + Sync {
    fn push(&self, route: Route);
}

/// Navigator that records the most recent push for the caller to act on.
#[derive(Debug, Default)]
pub struct PendingNavigation {
    target: Mutex<Option<Route>>,
}

impl PendingNavigation {
    pub fn take(&self) -> Option<Route> {
        self.target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Navigator for PendingNavigation {
    fn push(&self, route: Route) {
        tracing::debug!(path = route.path(), "Navigating");
        *self.target.lock().unwrap_or_else(PoisonError::into_inner) = Some(route);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Home,
    Login,
    Signup,
    Dashboard,
}

impl Page {
    /// Requires a session; visitors without one are sent to the login page.
    pub fn is_protected(self) -> bool {
        matches!(self, Page::Dashboard)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Checking,
    Authenticated(User),
    Unauthenticated,
}

/// Everything a page renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub page: Page,
    pub auth: AuthState,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MountOutcome {
    Render(AuthState),
    Redirected(Route),
    /// The controller was dropped before the check finished.
    Detached,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Navigated(Route),
    /// The error message is now shown on the page.
    Failed(AuthError),
    /// Another action was still in flight.
    Ignored,
    /// The controller was dropped before the action finished.
    Detached,
}

fn lock(model: &Mutex<ViewModel>) -> MutexGuard<'_, ViewModel> {
    model.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ticket for one in-flight action.
///
/// Dropping the ticket clears the busy flag, so an action future dropped
/// before completion does not leave the view stuck.
struct Action {
    model: Weak<Mutex<ViewModel>>,
    navigator: Arc<dyn Navigator>,
}

impl Drop for Action {
    fn drop(&mut self) {
        if let Some(model) = self.model.upgrade() {
            lock(&model).is_loading = false;
        }
    }
}

impl Action {
    fn finish(self, result: Result<Route>) -> ActionOutcome {
        let Some(model) = self.model.upgrade() else {
            tracing::debug!("View left before action completed, dropping result");
            return ActionOutcome::Detached;
        };

        let outcome = {
            let mut view = lock(&model);
            view.is_loading = false;
            match result {
                Ok(route) => ActionOutcome::Navigated(route),
                Err(e) => {
                    view.error = Some(e.message().to_string());
                    ActionOutcome::Failed(e)
                }
            }
        };

        if let ActionOutcome::Navigated(route) = &outcome {
            self.navigator.push(route.clone());
        }
        outcome
    }
}

/// Controller for one mounted page.
pub struct ViewController {
    gateway: SessionGateway,
    navigator: Arc<dyn Navigator>,
    model: Arc<Mutex<ViewModel>>,
}

impl ViewController {
    pub fn new(page: Page, gateway: SessionGateway, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            gateway,
            navigator,
            model: Arc::new(Mutex::new(ViewModel {
                page,
                auth: AuthState::Checking,
                is_loading: false,
                error: None,
            })),
        }
    }

    /// Snapshot of the current view state.
    pub fn view(&self) -> ViewModel {
        lock(&self.model).clone()
    }

    /// Show a message that arrived with the page (e.g. an OAuth failure).
    pub fn show_error(&self, message: impl Into<String>) {
        lock(&self.model).error = Some(message.into());
    }

    /// Check the session and branch: protected pages send visitors without a
    /// session to the login page, other pages send signed-in users to the
    /// dashboard. Runs once; later calls report the settled state.
    pub fn mount(&self) -> impl Future<Output = MountOutcome> + Send + 'static {
        let (page, settled) = {
            let view = lock(&self.model);
            let settled = (view.auth != AuthState::Checking).then(|| view.auth.clone());
            (view.page, settled)
        };
        let model = Arc::downgrade(&self.model);
        let gateway = self.gateway.clone();
        let navigator = self.navigator.clone();

        async move {
            if let Some(state) = settled {
                return MountOutcome::Render(state);
            }

            let user = gateway.get_current_user().await;

            let Some(model) = model.upgrade() else {
                tracing::debug!("View left before session check completed");
                return MountOutcome::Detached;
            };
            let state = match user {
                Some(user) => AuthState::Authenticated(user),
                None => AuthState::Unauthenticated,
            };
            lock(&model).auth = state.clone();

            let redirect = match &state {
                AuthState::Unauthenticated if page.is_protected() => Some(Route::Login),
                AuthState::Authenticated(_) if !page.is_protected() => Some(Route::Dashboard),
                _ => None,
            };
            match redirect {
                Some(route) => {
                    navigator.push(route.clone());
                    MountOutcome::Redirected(route)
                }
                None => MountOutcome::Render(state),
            }
        }
    }

    pub fn submit_login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = ActionOutcome> + Send + 'static {
        let (email, password) = (email.to_string(), password.to_string());
        self.run(move |gateway| async move {
            gateway.login(&email, &password).await?;
            Ok(Route::Dashboard)
        })
    }

    pub fn submit_signup(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> impl Future<Output = ActionOutcome> + Send + 'static {
        let (email, password, name) = (email.to_string(), password.to_string(), name.to_string());
        self.run(move |gateway| async move {
            gateway.signup(&email, &password, &name).await?;
            Ok(Route::Dashboard)
        })
    }

    /// Navigate to the provider's consent page.
    pub fn login_with_google(&self) -> impl Future<Output = ActionOutcome> + Send + 'static {
        self.run(|gateway| async move {
            match gateway.login_with_google() {
                Ok(redirect) => Ok(Route::External(redirect.url)),
                Err(e) => Err(AuthError::new(e.kind(), GOOGLE_LOGIN_ERROR)),
            }
        })
    }

    /// Handle the provider's redirect back to the application.
    pub fn complete_google_login(
        &self,
        callback: OAuthCallback,
    ) -> impl Future<Output = ActionOutcome> + Send + 'static {
        self.run(move |gateway| async move {
            match gateway.complete_google_login(&callback).await {
                Ok(_) => Ok(Route::Dashboard),
                Err(e) => Err(AuthError::new(e.kind(), GOOGLE_LOGIN_ERROR)),
            }
        })
    }

    /// GitHub sign-in has no backend support yet.
    pub fn login_with_github(&self) -> ActionOutcome {
        let mut view = lock(&self.model);
        if view.is_loading {
            return ActionOutcome::Ignored;
        }
        view.error = Some(GITHUB_NOT_IMPLEMENTED.to_string());
        ActionOutcome::Failed(AuthError::new(ErrorKind::Unknown, GITHUB_NOT_IMPLEMENTED))
    }

    pub fn logout(&self) -> impl Future<Output = ActionOutcome> + Send + 'static {
        self.run(|gateway| async move {
            gateway.logout().await?;
            Ok(Route::Login)
        })
    }

    /// Mark the view busy, then run `call` and apply its result if the view
    /// is still alive.
    fn run<F, Fut>(&self, call: F) -> impl Future<Output = ActionOutcome> + Send + 'static
    where
        F: FnOnce(SessionGateway) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Route>> + Send + 'static,
    {
        let action = self.begin();
        let gateway = self.gateway.clone();

        async move {
            let Some(action) = action else {
                return ActionOutcome::Ignored;
            };
            let result = call(gateway).await;
            action.finish(result)
        }
    }

    fn begin(&self) -> Option<Action> {
        let mut view = lock(&self.model);
        if view.is_loading {
            tracing::debug!(page = ?view.page, "Action ignored while another is in flight");
            return None;
        }
        view.is_loading = true;
        view.error = None;

        Some(Action {
            model: Arc::downgrade(&self.model),
            navigator: self.navigator.clone(),
        })
    }
}
