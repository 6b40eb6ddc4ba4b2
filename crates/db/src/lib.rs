//! Persistence layer: PostgreSQL via sqlx.
//!
//! Sessions are stored document-style — one row per session with the turn
//! history, character registry and pending-image slot as JSONB columns —
//! so partial updates (append a turn, set one turn's image URL) are single
//! atomic statements.

use sqlx::postgres::PgPoolOptions;

pub mod legacy;
pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending SQL migrations from the repository's `migrations/` directory.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
