//! ActivityService — append-only log of notable events. Recording is
//! best-effort: a failed insert is logged and swallowed, never propagated.

use crate::models::activity::ActivityEntry;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct ActivityService {
    db: Arc<SqlitePool>,
}

impl ActivityService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn record(&self, event: &str, detail: Option<String>) {
        let result = sqlx::query(
            "INSERT INTO activity_log (id, event, detail, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(event)
        .bind(detail)
        .bind(Utc::now())
        .execute(&*self.db)
        .await;
        if let Err(err) = result {
            warn!("failed to record activity `{}`: {}", event, err);
        }
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<ActivityEntry>, sqlx::Error> {
        sqlx::query_as::<_, ActivityEntry>(
            "SELECT id, event, detail, created_at FROM activity_log
             ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit.clamp(1, 500))
        .fetch_all(&*self.db)
        .await
    }
}
