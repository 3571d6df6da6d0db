//! Error types with IntoResponse
//!
//! Page routes render HTML error pages, API routes answer JSON. Internal
//! details are logged, never sent to the client.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use quire_core::DbError;
use serde_json::json;

use crate::models::ValidationError;
use crate::password::PasswordError;
use crate::views;

/// Page route error
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("page not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<quire_core::SessionError> for AppError {
    fn from(e: quire_core::SessionError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, Html(views::not_found())).into_response(),
            Self::Database(e) => {
                tracing::error!(error = %e, "database error");
                server_error()
            }
            Self::Internal(message) => {
                tracing::error!(%message, "internal error");
                server_error()
            }
        }
    }
}

impl AppError {
    /// JSON for API routes, an HTML page for everything else.
    pub fn into_response_for(self, api: bool) -> Response {
        if !api {
            return self.into_response();
        }
        match self {
            Self::NotFound => ApiError::NotFound("resource"),
            Self::Database(e) => ApiError::from(e),
            Self::Internal(message) => ApiError::Internal(message),
        }
        .into_response()
    }
}

/// Routes under `/api` answer JSON.
pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(views::server_error())).into_response()
}

/// API error type with automatic HTTP status mapping
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Validation failed (400)
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No authenticated user (401)
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found (404)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate resource (409)
    #[error("{0}")]
    Conflict(String),

    /// Database error (500, logged)
    #[error(transparent)]
    Database(DbError),

    /// Anything else (500, logged)
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, .. } => Self::NotFound(resource),
            DbError::Conflict { resource, .. } => {
                Self::Conflict(format!("{resource} already exists"))
            }
            _ => Self::Database(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation(e) => (StatusCode::BAD_REQUEST, json!({ "error": e.to_string() })),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": "unauthorized" })),
            Self::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{} not found", capitalize(resource)) }),
            ),
            Self::Conflict(message) => (StatusCode::CONFLICT, json!({ "error": message })),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!(error = %e, "database error");
                internal()
            }
            Self::Internal(message) => {
                tracing::error!(%message, "internal error");
                internal()
            }
        };

        (status, Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, serde_json::Value) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "an internal error occurred" }),
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] DbError),
}
