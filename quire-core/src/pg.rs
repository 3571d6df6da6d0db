//! PostgreSQL provider backed by a sqlx pool
//!
//! The pool sits beneath the provider; each scope checks out one
//! connection and returns it at scope end.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool, Postgres};

use crate::auth::IdentityStore;
use crate::error::{DbError, Result};
use crate::identity::User;
use crate::provider::{ConnectionProvider, StoreConnection};

/// Default maximum connections for the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// How long a scope waits for a free connection before giving up.
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub type PgConn = PoolConnection<Postgres>;

/// Create a PostgreSQL connection pool.
///
/// # Errors
///
/// Returns an error if the first connection fails.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_options(database_url, DEFAULT_MAX_CONNECTIONS).await
}

/// Create a PostgreSQL connection pool with custom options.
pub async fn create_pool_with_options(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
        .map_err(DbError::connection)
}

#[derive(Debug, Clone)]
pub struct PgProvider {
    pool: PgPool,
}

impl PgProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionProvider for PgProvider {
    type Conn = PgConn;

    async fn connect(&self) -> Result<PgConn> {
        self.pool.acquire().await.map_err(DbError::connection)
    }
}

#[async_trait]
impl StoreConnection for PgConn {
    async fn begin(&mut self) -> std::result::Result<(), sqlx::Error> {
        (&mut **self).execute("BEGIN").await.map(drop)
    }

    async fn commit(&mut self) -> std::result::Result<(), sqlx::Error> {
        (&mut **self).execute("COMMIT").await.map(drop)
    }

    async fn rollback(&mut self) -> std::result::Result<(), sqlx::Error> {
        (&mut **self).execute("ROLLBACK").await.map(drop)
    }

    async fn release(self) -> std::result::Result<(), sqlx::Error> {
        // back to the pool
        drop(self);
        Ok(())
    }

    fn abandon(self) {
        // closing the socket makes the server roll back whatever is open
        drop(self.detach());
    }
}

#[async_trait]
impl IdentityStore for PgConn {
    async fn find_user(&mut self, id: i32) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **self)
        .await?;
        Ok(user)
    }
}
