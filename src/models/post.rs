//! Blog posts, comments and print inquiries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A blog post. `meta_title`/`meta_description` feed the SEO tags and the
/// RSS/Atom output; only published posts appear anywhere public.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub cover_photo_id: Option<Uuid>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A visitor comment on a post. Held for moderation until approved.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_name: String,
    pub author_email: String,
    pub body: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// A print inquiry submitted from a photo page.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Inquiry {
    pub id: Uuid,
    pub photo_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
