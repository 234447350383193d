//! Represents a gallery — a curated set of photos, optionally shared with a
//! client through a private token link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// What kind of gallery this is.
///
/// `Portfolio` and `Series` galleries are public-facing and gated only by
/// `is_published`. `Client` galleries are reached through their access token
/// and never appear in public listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GalleryKind {
    Portfolio,
    Series,
    Client,
}

/// A gallery of photos.
///
/// Client galleries carry the proofing controls: an opaque access token,
/// an optional password hash, an optional expiry, and the download/selection
/// switches. A gallery past its `expires_at` is inaccessible regardless of
/// any password grant held by the session.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Gallery {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub kind: GalleryKind,
    pub cover_photo_id: Option<Uuid>,
    pub is_published: bool,

    /// Opaque token for client links. Unique; regenerable by the admin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Salted SHA-256 hash, `salt$digest` hex. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// After this instant the gallery is gone for good.
    pub expires_at: Option<DateTime<Utc>>,

    /// Whether client visitors may download photo files.
    pub allow_downloads: bool,

    /// Whether client visitors may build a selection set.
    pub allow_selections: bool,

    /// Upper bound on the selection set per session, if any.
    pub selection_limit: Option<i64>,

    pub view_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Gallery {
    /// True when `expires_at` is set and in the past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    /// True when this gallery requires a password grant before viewing.
    pub fn is_password_protected(&self) -> bool {
        self.password_hash.is_some()
    }
}
