//! Repository implementations for database access
//!
//! Each repository wraps `&mut PgConnection` taken from the request scope,
//! so reads and writes inside one unit of work share its transaction.

pub mod posts;
pub mod users;

pub use posts::{Post, PostRepo, PostWithAuthor};
pub use users::{UserCredentials, UserRepo};
