//! Request scope and login gates
//!
//! `request_scope` wraps every request: begin a scope, resolve the session
//! identity once, run the handler, end the scope. The login gates run after
//! it and only read the resolved identity.

use std::panic::AssertUnwindSafe;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use futures::FutureExt;
use quire_core::AccessGate;
use tracing::Instrument;

use super::cookies;
use super::error::{is_api_path, ApiError, AppError};
use super::extractors::{CurrentUser, RequestScope};
use crate::state::AppState;

const LOGIN_REQUIRED: &str = "You need to be logged in to view this page.";

pub async fn request_scope(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let lifecycle = state.lifecycle().clone();
    let handle = lifecycle.begin();
    let span = tracing::info_span!("scope", scope_id = %handle.id());

    async move {
        let api = is_api_path(req.uri().path());
        let token = cookies::session_token(&CookieJar::from_headers(req.headers()));
        let resolved = {
            let mut scope = handle.lock().await;
            state.resolver().resolve(&mut scope, token.as_ref()).await
        };

        let response = match resolved {
            Err(e) if api => ApiError::from(e).into_response(),
            Err(e) => AppError::from(e).into_response(),
            Ok(identity) => {
                req.extensions_mut().insert(identity);
                req.extensions_mut().insert(RequestScope(handle.clone()));
                match AssertUnwindSafe(next.run(req)).catch_unwind().await {
                    Ok(response) => response,
                    Err(_) => {
                        tracing::error!("handler panicked");
                        let err = AppError::Internal("handler panicked".into());
                        err.into_response_for(api)
                    }
                }
            }
        };

        lifecycle.end(handle).await;
        response
    }
    .instrument(span)
    .await
}

/// How a login gate answers an anonymous request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// 303 to the login form with a flash message
    Redirect,
    /// 401 JSON
    Unauthorized,
}

impl GateMode {
    fn deny(self, secure: bool) -> Response {
        match self {
            Self::Redirect => {
                let jar = cookies::with_flash(CookieJar::new(), LOGIN_REQUIRED, secure);
                (jar, Redirect::to("/login")).into_response()
            }
            Self::Unauthorized => ApiError::Unauthorized.into_response(),
        }
    }
}

/// Run the access gate. An admitted user is attached to the request.
async fn admit(req: &mut Request) -> bool {
    let Some(handle) = req.extensions().get::<RequestScope>().cloned() else {
        tracing::error!("login gate installed without request scope");
        return false;
    };

    let scope = handle.lock().await;
    let verdict = tracing::info_span!("gate", path = %req.uri().path())
        .in_scope(|| AccessGate::authorize(&*scope));
    drop(scope);

    match verdict {
        Ok(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            true
        }
        Err(_) => false,
    }
}

/// Page routes: anonymous visitors go to the login form.
pub async fn require_login(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if admit(&mut req).await {
        return next.run(req).await;
    }
    GateMode::Redirect.deny(state.cookie_secure())
}

/// API routes: anonymous callers get a 401.
pub async fn require_api_login(mut req: Request, next: Next) -> Response {
    if admit(&mut req).await {
        return next.run(req).await;
    }
    GateMode::Unauthorized.deny(false)
}
