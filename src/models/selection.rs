//! A visitor's session-scoped photo selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One selected photo for one session. Existence means "selected";
/// uniqueness over (session_id, photo_id) is enforced by the table.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ClientSelection {
    pub id: Uuid,
    pub session_id: String,
    pub photo_id: Uuid,
    pub gallery_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Selection row joined with photo/gallery titles, used for exports.
#[derive(Serialize, Clone, FromRow, Debug)]
pub struct SelectionExportRow {
    pub photo_title: String,
    pub photo_slug: String,
    pub gallery_title: Option<String>,
    pub created_at: DateTime<Utc>,
}
