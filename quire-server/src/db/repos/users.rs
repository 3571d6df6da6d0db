//! User repository
//!
//! - create: INSERT ... RETURNING, unique violations become conflicts
//! - find_credentials: login lookup including the password hash

use quire_core::{DbError, User};
use sqlx::{FromRow, PgConnection};

use crate::models::NewUser;

/// Login lookup row; never leaves the login handler
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
}

/// User repository
pub struct UserRepo<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> UserRepo<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// True when either the username or the email is already registered.
    pub async fn exists(&mut self, username: &str, email: &str) -> Result<bool, DbError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(exists)
    }

    /// Insert a user with an already hashed password.
    pub async fn create(&mut self, user: &NewUser, password_hash: &str) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(password_hash)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| DbError::from_query("user", e))
    }

    pub async fn find_credentials(
        &mut self,
        username: &str,
    ) -> Result<Option<UserCredentials>, DbError> {
        let row = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(row)
    }
}
