//! Post repository
//!
//! All reads JOIN the author in one query (no N+1).

use chrono::{DateTime, Utc};
use quire_core::DbError;
use serde::Serialize;
use sqlx::{FromRow, PgConnection};

use crate::models::NewPost;

/// Post record from database
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: Option<String>,
    pub user_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Post with its author's username for display
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PostWithAuthor {
    pub id: i32,
    pub title: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub username: String,
}

/// Post repository
pub struct PostRepo<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PostRepo<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// All posts, newest first.
    pub async fn list(&mut self) -> Result<Vec<PostWithAuthor>, DbError> {
        let posts = sqlx::query_as::<_, PostWithAuthor>(
            r#"
            SELECT p.id, p.title, p.content, p.created_at, u.username
            FROM posts p
            JOIN users u ON p.user_id = u.id
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(posts)
    }

    pub async fn get(&mut self, id: i32) -> Result<Option<PostWithAuthor>, DbError> {
        let post = sqlx::query_as::<_, PostWithAuthor>(
            r#"
            SELECT p.id, p.title, p.content, p.created_at, u.username
            FROM posts p
            JOIN users u ON p.user_id = u.id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(post)
    }

    pub async fn create(&mut self, post: &NewPost, author_id: i32) -> Result<Post, DbError> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (title, content, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, content, user_id, created_at
            "#,
        )
        .bind(&post.title)
        .bind(post.content.as_deref())
        .bind(author_id)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| DbError::from_query("post", e))
    }
}
