//! Represents a photo in the catalog, plus its category and tag entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of the derived image variants for a photo.
///
/// A photo starts `Pending` right after upload, becomes `Ready` once the
/// optimized/watermarked/thumbnail variants exist on disk, and `Failed` if
/// variant generation errored. The admin UI polls this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Ready,
    Failed,
}

/// A single photograph in the catalog.
///
/// The payload lives on disk; the row stores relative paths to the original
/// and its derived variants, along with shooting metadata and publication
/// state.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Photo {
    /// Unique identifier (UUID for internal DB use).
    pub id: Uuid,

    /// Display title.
    pub title: String,

    /// URL slug, unique across all photos.
    pub slug: String,

    /// Long-form description, shown on the photo page and used for SEO.
    pub description: Option<String>,

    /// Alternative text for accessibility and image sitemaps.
    pub alt_text: Option<String>,

    /// Relative path of the uploaded original under the media directory.
    pub original_path: String,

    /// Relative path of the resized web variant, if generated.
    pub optimized_path: Option<String>,

    /// Relative path of the watermarked variant, if generated.
    pub watermarked_path: Option<String>,

    /// Relative path of the thumbnail, if generated.
    pub thumbnail_path: Option<String>,

    /// MIME type of the original upload.
    pub content_type: Option<String>,

    /// Size of the original in bytes.
    pub size_bytes: i64,

    /// MD5 checksum of the original, for integrity checks.
    pub etag: Option<String>,

    /// Pixel dimensions of the original, filled in during processing.
    pub width: Option<i64>,
    pub height: Option<i64>,

    /// Equipment metadata.
    pub camera: Option<String>,
    pub lens: Option<String>,
    pub focal_length: Option<String>,
    pub aperture: Option<String>,
    pub shutter_speed: Option<String>,
    pub iso: Option<String>,

    /// Where the photo was taken.
    pub location: Option<String>,

    /// When the photo was taken.
    pub taken_at: Option<DateTime<Utc>>,

    /// Optional category.
    pub category_id: Option<Uuid>,

    /// Whether the photo is visible on the public site.
    pub is_published: bool,

    /// Whether the photo is pinned to the front page.
    pub is_featured: bool,

    /// Variant-generation state, polled by the admin UI.
    pub processing_status: ProcessingStatus,

    /// Denormalized count of session likes.
    pub like_count: i64,

    /// Public page views.
    pub view_count: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A browsing category for photos.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    /// Manual ordering on listing pages, ascending.
    pub sort_order: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// A free-form tag. Photos and tags are joined via `photo_tags`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}
