//! Registration, login and profile
//!
//! GET|POST /register
//! GET|POST /login
//! GET      /logout
//! GET      /profile (login required)

use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use axum_extra::extract::cookie::CookieJar;
use quire_core::{DbError, UnitOfWork, User};
use serde::Deserialize;

use crate::db::UserRepo;
use crate::http::cookies;
use crate::http::error::AppError;
use crate::http::extractors::{CurrentUser, Flash, RequestScope, Viewer};
use crate::http::middleware::require_login;
use crate::models::NewUser;
use crate::password;
use crate::state::AppState;
use crate::views::{self, Page};

const DUPLICATE_USER: &str = "User with this username or email already exists.";
const BAD_CREDENTIALS: &str = "Incorrect username or password.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

async fn register_form(Viewer(viewer): Viewer, flash: Flash) -> Page {
    Page::new("Register", views::register_form("", ""))
        .viewer(viewer)
        .flash(flash)
}

async fn register(
    State(state): State<AppState>,
    handle: RequestScope,
    Viewer(viewer): Viewer,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let retry = |message: &str| {
        tracing::warn!(username = %form.username, reason = message, "registration failed");
        Page::new("Register", views::register_form(&form.username, &form.email))
            .viewer(viewer.clone())
            .message(message)
            .into_response()
    };

    let new_user = match NewUser::new(&form.username, &form.email, &form.password) {
        Ok(user) => user,
        Err(e) => return Ok(retry(&e.to_string())),
    };
    let password_hash = password::hash(new_user.password.clone()).await?;

    let mut scope = handle.lock().await;
    let created: Result<Option<User>, DbError> = UnitOfWork::new("register")
        .run(&mut scope, move |scope| {
            Box::pin(async move {
                let mut users = UserRepo::new(&mut **scope.acquire().await?);
                if users.exists(&new_user.username, &new_user.email).await? {
                    return Ok(None);
                }
                users.create(&new_user, &password_hash).await.map(Some)
            })
        })
        .await;

    match created {
        Ok(Some(user)) => {
            tracing::info!(user_id = user.id, username = %user.username, "user registered");
            let message = "Registration successful! Please log in.";
            let jar = cookies::with_flash(jar, message, state.cookie_secure());
            Ok((jar, Redirect::to("/login")).into_response())
        }
        // a concurrent registration can still lose the race at the constraint
        Ok(None) | Err(DbError::Conflict { .. }) => Ok(retry(DUPLICATE_USER)),
        Err(e) => Err(e.into()),
    }
}

async fn login_form(Viewer(viewer): Viewer, flash: Flash) -> Page {
    Page::new("Login", views::login_form("")).viewer(viewer).flash(flash)
}

async fn login(
    State(state): State<AppState>,
    handle: RequestScope,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let credentials = {
        let mut scope = handle.lock().await;
        UserRepo::new(&mut **scope.acquire().await?)
            .find_credentials(form.username.trim())
            .await?
    };

    let user = match credentials {
        Some(found) => {
            let hash = found.password_hash.clone();
            password::verify(form.password.clone(), hash).await.then_some(found)
        }
        None => None,
    };
    let Some(user) = user else {
        tracing::warn!(username = %form.username, "login failed");
        let page = Page::new("Login", views::login_form(&form.username))
            .message(BAD_CREDENTIALS);
        return Ok(page.into_response());
    };

    let keys = state.resolver().keys();
    let token = keys.issue(user.id)?;
    tracing::info!(user_id = user.id, username = %user.username, "user logged in");

    let secure = state.cookie_secure();
    let jar = cookies::with_session(jar, &token, keys.ttl(), secure);
    let jar = cookies::with_flash(jar, "Logged in successfully!", secure);
    Ok((jar, Redirect::to("/")).into_response())
}

async fn logout(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(user) = viewer {
        tracing::info!(user_id = user.id, "user logged out");
    }
    let secure = state.cookie_secure();
    let jar = cookies::without_session(jar, secure);
    let jar = cookies::with_flash(jar, "You have been logged out.", secure);
    (jar, Redirect::to("/"))
}

async fn profile(CurrentUser(user): CurrentUser, flash: Flash) -> Page {
    tracing::debug!(user_id = user.id, "rendering profile");
    Page::new("Profile", views::profile(&user))
        .viewer(Some(user))
        .flash(flash)
}

/// Account routes
pub fn router(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/profile", get(profile))
        .route_layer(from_fn_with_state(state.clone(), require_login));

    Router::new()
        .route("/register", get(register_form).post(register))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .merge(protected)
}
