//! Custom Axum extractors

use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use quire_core::{Identity, PgProvider, ScopeHandle, User};

use super::cookies;
use super::error::{is_api_path, AppError};

/// The request's scope, installed by [`super::middleware::request_scope`].
#[derive(Clone)]
pub struct RequestScope(pub ScopeHandle<PgProvider>);

impl Deref for RequestScope {
    type Target = ScopeHandle<PgProvider>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestScope>()
            .cloned()
            .ok_or_else(|| missing(parts, "request scope middleware not installed"))
    }
}

/// Identity resolved for this request. Anonymous when the scope
/// middleware did not run.
pub struct Viewer(pub Option<User>);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<Identity>()
            .and_then(Identity::user)
            .cloned();
        Ok(Self(user))
    }
}

/// User admitted by a login gate. Only present on protected routes.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| missing(parts, "route is missing its login gate"))
    }
}

/// Pending flash message from the previous response.
#[derive(Debug, Default)]
pub struct Flash(pub Option<String>);

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(cookies::read_flash(&CookieJar::from_headers(&parts.headers))))
    }
}

/// Wiring error: a layer the extractor depends on did not run.
fn missing(parts: &Parts, message: &str) -> Response {
    AppError::Internal(message.into()).into_response_for(is_api_path(parts.uri.path()))
}
