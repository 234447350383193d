//! Shared test setup: an in-memory SQLite pool with the real schema, plus
//! row fixtures.

use chrono::Utc;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::sync::Arc;
use uuid::Uuid;

/// Fresh in-memory database with the production schema applied.
/// One connection: every handle must see the same memory database.
pub async fn test_pool() -> Arc<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    let schema = include_str!("../../migrations/0001_init.sql");
    for stmt in schema.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(stmt).execute(&pool).await.expect("migration statement");
    }
    Arc::new(pool)
}

/// Insert a minimal photo row and return its id.
pub async fn insert_photo(db: &SqlitePool, slug: &str, published: bool) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO photos (id, title, slug, original_path, is_published, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(format!("Photo {slug}"))
    .bind(slug)
    .bind(format!("originals/aa/bb/{id}.jpg"))
    .bind(published)
    .bind(now)
    .bind(now)
    .execute(db)
    .await
    .expect("insert photo");
    id
}
