//! Append-only activity log entries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// One notable event (order created, inquiry received, email failure, ...).
/// Recording is best-effort and never blocks the primary operation.
#[derive(Serialize, Clone, FromRow, Debug)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub event: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}
