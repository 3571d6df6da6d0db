//! Schema setup for users and posts

use sqlx::PgPool;

use quire_core::DbError;

/// Create required tables if they do not exist. Safe to run repeatedly.
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Initializing database");

    let mut tx = pool.begin().await.map_err(DbError::connection)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            username VARCHAR(80) UNIQUE NOT NULL,
            email VARCHAR(120) UNIQUE NOT NULL,
            password_hash VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id SERIAL PRIMARY KEY,
            title VARCHAR(200) NOT NULL,
            content TEXT,
            user_id INTEGER REFERENCES users(id),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at DESC)")
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!("Database initialized");
    Ok(())
}
