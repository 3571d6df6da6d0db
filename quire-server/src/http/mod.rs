//! HTTP server layer
//!
//! Axum server with:
//! - One request scope per request, torn down after the response
//! - Session cookie login with page and API gates
//! - HTML error pages, JSON errors under /api
//! - Graceful shutdown

pub mod cookies;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::{ApiError, AppError, ServerError};
pub use server::{build_router, run_server};
