//! JSON posts API
//!
//! GET  /api/posts       - {"posts": [...]}
//! GET  /api/posts/{id}  - one post or 404
//! POST /api/posts       - create a post (401 when anonymous)

use axum::extract::rejection::PathRejection;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::{Json, Router};
use quire_core::UnitOfWork;
use serde::{Deserialize, Serialize};

use crate::db::{PostRepo, PostWithAuthor};
use crate::http::error::ApiError;
use crate::http::extractors::{CurrentUser, RequestScope};
use crate::http::middleware::require_api_login;
use crate::models::NewPost;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PostsResponse {
    pub posts: Vec<PostWithAuthor>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

async fn list_posts(handle: RequestScope) -> Result<Json<PostsResponse>, ApiError> {
    let mut scope = handle.lock().await;
    let posts = PostRepo::new(&mut **scope.acquire().await?).list().await?;
    tracing::debug!(count = posts.len(), "returning posts via api");
    Ok(Json(PostsResponse { posts }))
}

async fn get_post(
    handle: RequestScope,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<PostWithAuthor>, ApiError> {
    let Ok(Path(id)) = id else {
        return Err(ApiError::NotFound("post"));
    };

    let mut scope = handle.lock().await;
    let post = PostRepo::new(&mut **scope.acquire().await?).get(id).await?;

    match post {
        Some(post) => Ok(Json(post)),
        None => {
            tracing::warn!(post_id = id, "post not found via api");
            Err(ApiError::NotFound("post"))
        }
    }
}

async fn create_post(
    handle: RequestScope,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostWithAuthor>), ApiError> {
    let new_post = NewPost::new(&req.title, req.content.as_deref().unwrap_or_default())?;

    let author_id = user.id;
    let mut scope = handle.lock().await;
    let post = UnitOfWork::new("api_create_post")
        .run(&mut scope, move |scope| {
            Box::pin(async move {
                let conn = scope.acquire().await?;
                PostRepo::new(&mut **conn).create(&new_post, author_id).await
            })
        })
        .await?;

    tracing::info!(post_id = post.id, user_id = author_id, "post created via api");
    Ok((
        StatusCode::CREATED,
        Json(PostWithAuthor {
            id: post.id,
            title: post.title,
            content: post.content,
            created_at: post.created_at,
            username: user.username,
        }),
    ))
}

/// API routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/posts",
            get(list_posts).merge(post(create_post).route_layer(from_fn(require_api_login))),
        )
        .route("/api/posts/{id}", get(get_post))
}
