//! Post pages
//!
//! GET  /                - home page, newest posts first
//! GET  /posts           - all posts
//! GET  /posts/{id}      - one post, or back to the list with a flash
//! GET  /posts/create    - new post form (login required)
//! POST /posts/create    - create a post (login required)

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use axum_extra::extract::cookie::CookieJar;
use quire_core::UnitOfWork;
use serde::Deserialize;

use crate::db::PostRepo;
use crate::http::cookies;
use crate::http::error::AppError;
use crate::http::extractors::{CurrentUser, Flash, RequestScope, Viewer};
use crate::http::middleware::require_login;
use crate::models::NewPost;
use crate::state::AppState;
use crate::views::{self, Page};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
}

async fn index(
    handle: RequestScope,
    Viewer(viewer): Viewer,
    flash: Flash,
) -> Result<Page, AppError> {
    let mut scope = handle.lock().await;
    let posts = PostRepo::new(&mut **scope.acquire().await?).list().await?;
    tracing::debug!(count = posts.len(), "fetched posts for home page");

    Ok(Page::new("Home", views::home(&posts)).viewer(viewer).flash(flash))
}

async fn list_posts(
    handle: RequestScope,
    Viewer(viewer): Viewer,
    flash: Flash,
) -> Result<Page, AppError> {
    let mut scope = handle.lock().await;
    let posts = PostRepo::new(&mut **scope.acquire().await?).list().await?;
    tracing::debug!(count = posts.len(), "fetched posts");

    Ok(Page::new("Posts", views::posts_list(&posts))
        .viewer(viewer)
        .flash(flash))
}

async fn post_detail(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    handle: RequestScope,
    Viewer(viewer): Viewer,
    flash: Flash,
    jar: CookieJar,
) -> Result<Response, AppError> {
    // non-numeric ids never match a post
    let Ok(Path(id)) = id else {
        return Err(AppError::NotFound);
    };

    let mut scope = handle.lock().await;
    let post = PostRepo::new(&mut **scope.acquire().await?).get(id).await?;

    let Some(post) = post else {
        tracing::warn!(post_id = id, "post not found");
        let jar = cookies::with_flash(jar, "Post not found.", state.cookie_secure());
        return Ok((jar, Redirect::to("/posts")).into_response());
    };

    Ok(Page::new("Post", views::post_detail(&post))
        .viewer(viewer)
        .flash(flash)
        .into_response())
}

async fn create_form(CurrentUser(user): CurrentUser, flash: Flash) -> Page {
    Page::new("New Post", views::post_form("", ""))
        .viewer(Some(user))
        .flash(flash)
}

async fn create_post(
    State(state): State<AppState>,
    handle: RequestScope,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    let new_post = match NewPost::new(&form.title, &form.content) {
        Ok(post) => post,
        Err(e) => {
            tracing::warn!(error = %e, "post creation failed");
            let page = Page::new("New Post", views::post_form(&form.title, &form.content))
                .viewer(Some(user))
                .message(e.to_string());
            return Ok(page.into_response());
        }
    };

    let author_id = user.id;
    let mut scope = handle.lock().await;
    let post = UnitOfWork::new("create_post")
        .run(&mut scope, move |scope| {
            Box::pin(async move {
                let conn = scope.acquire().await?;
                PostRepo::new(&mut **conn).create(&new_post, author_id).await
            })
        })
        .await?;

    tracing::info!(post_id = post.id, title = %post.title, "post created");
    let jar = cookies::with_flash(jar, "Post created successfully!", state.cookie_secure());
    Ok((jar, Redirect::to("/posts")).into_response())
}

/// Post page routes
pub fn router(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/posts/create", get(create_form).post(create_post))
        .route_layer(from_fn_with_state(state.clone(), require_login));

    Router::new()
        .route("/", get(index))
        .route("/posts", get(list_posts))
        .route("/posts/{id}", get(post_detail))
        .merge(protected)
}
