//! Database layer - schema and repositories
//!
//! # Design Principles
//!
//! - Repositories borrow the request scope's connection, never the pool
//! - Writes run inside a `UnitOfWork` at the handler level
//! - Rely on DB constraints, map unique violations to `DbError::Conflict`

pub mod migrations;
pub mod repos;

pub use repos::*;
