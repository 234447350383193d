//! SettingsService — key-value settings with a read-through cache.
//!
//! Reads hit the cache first and fall through to the table; writes update
//! the table and then the cache entry (invalidate-on-write). The service is
//! injected wherever settings are needed; there is no ambient global.

use chrono::Utc;
use sqlx::SqlitePool;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct SettingsService {
    db: Arc<SqlitePool>,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl SettingsService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self {
            db,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Read a setting, caching the value on first access.
    pub async fn get(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        if let Some(value) = self.cache.read().await.get(key) {
            return Ok(Some(value.clone()));
        }
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&*self.db)
                .await?;
        if let Some(value) = &value {
            self.cache
                .write()
                .await
                .insert(key.to_string(), value.clone());
        }
        Ok(value)
    }

    pub async fn get_or(&self, key: &str, default: &str) -> Result<String, sqlx::Error> {
        Ok(self.get(key).await?.unwrap_or_else(|| default.to_string()))
    }

    pub async fn get_i64(&self, key: &str, default: i64) -> Result<i64, sqlx::Error> {
        Ok(self
            .get(key)
            .await?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(default))
    }

    /// Upsert a setting and refresh the cached entry.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&*self.db)
        .await?;
        self.cache
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Delete a setting and drop it from the cache.
    pub async fn remove(&self, key: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&*self.db)
            .await?;
        self.cache.write().await.remove(key);
        Ok(())
    }

    /// All settings straight from the table (admin listing).
    pub async fn all(&self) -> Result<HashMap<String, String>, sqlx::Error> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings ORDER BY key ASC")
                .fetch_all(&*self.db)
                .await?;
        Ok(rows.into_iter().collect())
    }
}
