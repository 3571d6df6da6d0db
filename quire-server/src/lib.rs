//! quire-server: pages, session login and the posts API
//!
//! Every request runs inside a request scope from `quire-core`: one lazily
//! opened connection, one resolved identity, writes grouped into units of
//! work, released when the response is ready.

pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod password;
pub mod state;
pub mod views;

pub use config::{Environment, ServerConfig};
pub use http::{build_router, run_server, ServerError};
pub use state::AppState;
