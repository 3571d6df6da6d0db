//! Connection provider seam
//!
//! A [`ConnectionProvider`] hands out one live connection per request scope.
//! The scope caches what it gets, so `connect` runs at most once per request.

use async_trait::async_trait;

use crate::error::Result;

/// Transaction and teardown operations every scope connection supports.
#[async_trait]
pub trait StoreConnection: Send + Sized + 'static {
    async fn begin(&mut self) -> std::result::Result<(), sqlx::Error>;

    async fn commit(&mut self) -> std::result::Result<(), sqlx::Error>;

    async fn rollback(&mut self) -> std::result::Result<(), sqlx::Error>;

    /// Graceful release at the end of a scope.
    async fn release(self) -> std::result::Result<(), sqlx::Error>;

    /// Discard a connection whose transaction state is unknown.
    ///
    /// Runs from `Drop`, so it cannot await. Implementations must make sure
    /// the connection is never reused with an open transaction.
    fn abandon(self);
}

/// Supplies connections to request scopes.
#[async_trait]
pub trait ConnectionProvider: Send + Sync + 'static {
    type Conn: StoreConnection;

    /// Establish a connection. Failures are [`crate::DbError::Connection`]
    /// and are not retried.
    async fn connect(&self) -> Result<Self::Conn>;
}
