//! GalleryService — gallery CRUD plus the client access rules: token
//! resolution, expiry, password verification and the per-gallery
//! download/selection switches.

use crate::{
    errors::AppError,
    models::{
        gallery::{Gallery, GalleryKind},
        photo::Photo,
    },
    services::is_unique_violation,
};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const GALLERY_COLUMNS: &str = "id, title, slug, description, kind, cover_photo_id, is_published, \
     access_token, password_hash, expires_at, allow_downloads, allow_selections, \
     selection_limit, view_count, last_accessed_at, created_at, updated_at";

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("gallery `{0}` not found")]
    NotFound(String),
    #[error("gallery link has expired")]
    Expired,
    #[error("password required")]
    PasswordRequired,
    #[error("incorrect password")]
    WrongPassword,
    #[error("downloads are not enabled for this gallery")]
    DownloadsDisabled,
    #[error("selections are not enabled for this gallery")]
    SelectionsDisabled,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type GalleryResult<T> = Result<T, GalleryError>;

impl From<GalleryError> for AppError {
    fn from(err: GalleryError) -> Self {
        match err {
            GalleryError::NotFound(_) => AppError::not_found(err.to_string()),
            GalleryError::Expired
            | GalleryError::DownloadsDisabled
            | GalleryError::SelectionsDisabled => AppError::forbidden(err.to_string()),
            GalleryError::PasswordRequired | GalleryError::WrongPassword => {
                AppError::unauthorized(err.to_string())
            }
            GalleryError::Validation(msg) => AppError::validation(msg),
            GalleryError::Sqlx(sqlx::Error::RowNotFound) => AppError::not_found("not found"),
            GalleryError::Sqlx(other) => AppError::internal(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct NewGallery {
    pub title: String,
    pub description: Option<String>,
    pub kind: Option<GalleryKind>,
    pub cover_photo_id: Option<Uuid>,
    #[serde(default)]
    pub is_published: bool,
    pub password: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub allow_downloads: bool,
    #[serde(default)]
    pub allow_selections: bool,
    pub selection_limit: Option<i64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct UpdateGallery {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_photo_id: Option<Uuid>,
    pub is_published: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clear_expires_at: bool,
    pub allow_downloads: Option<bool>,
    pub allow_selections: Option<bool>,
    pub selection_limit: Option<i64>,
    #[serde(default)]
    pub clear_selection_limit: bool,
}

#[derive(Clone)]
pub struct GalleryService {
    db: Arc<SqlitePool>,
}

impl GalleryService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn create(&self, new: NewGallery) -> GalleryResult<Gallery> {
        if new.title.trim().is_empty() {
            return Err(GalleryError::Validation("title is required".into()));
        }
        let kind = new.kind.unwrap_or(GalleryKind::Portfolio);
        let slug = self.unique_slug(&super::catalog_service::slugify(&new.title)).await?;
        let access_token = match kind {
            GalleryKind::Client => Some(generate_access_token()),
            _ => None,
        };
        let password_hash = new.password.as_deref().map(hash_password);
        let now = Utc::now();

        Ok(sqlx::query_as::<_, Gallery>(&format!(
            "INSERT INTO galleries (
                id, title, slug, description, kind, cover_photo_id, is_published,
                access_token, password_hash, expires_at, allow_downloads, allow_selections,
                selection_limit, view_count, last_accessed_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL, ?, ?)
            RETURNING {GALLERY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.title.trim())
        .bind(&slug)
        .bind(new.description)
        .bind(kind)
        .bind(new.cover_photo_id)
        .bind(new.is_published)
        .bind(access_token)
        .bind(password_hash)
        .bind(new.expires_at)
        .bind(new.allow_downloads)
        .bind(new.allow_selections)
        .bind(new.selection_limit)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?)
    }

    pub async fn update(&self, id: Uuid, update: UpdateGallery) -> GalleryResult<Gallery> {
        let current = self.get(id).await?;
        let expires_at = if update.clear_expires_at {
            None
        } else {
            update.expires_at.or(current.expires_at)
        };
        let selection_limit = if update.clear_selection_limit {
            None
        } else {
            update.selection_limit.or(current.selection_limit)
        };
        sqlx::query(
            "UPDATE galleries SET title = ?, description = ?, cover_photo_id = ?,
                 is_published = ?, expires_at = ?, allow_downloads = ?, allow_selections = ?,
                 selection_limit = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(update.title.unwrap_or(current.title))
        .bind(update.description.or(current.description))
        .bind(update.cover_photo_id.or(current.cover_photo_id))
        .bind(update.is_published.unwrap_or(current.is_published))
        .bind(expires_at)
        .bind(update.allow_downloads.unwrap_or(current.allow_downloads))
        .bind(update.allow_selections.unwrap_or(current.allow_selections))
        .bind(selection_limit)
        .bind(Utc::now())
        .bind(id)
        .execute(&*self.db)
        .await?;
        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> GalleryResult<()> {
        let affected = sqlx::query("DELETE FROM galleries WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(GalleryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> GalleryResult<Gallery> {
        sqlx::query_as::<_, Gallery>(&format!(
            "SELECT {GALLERY_COLUMNS} FROM galleries WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => GalleryError::NotFound(id.to_string()),
            other => GalleryError::Sqlx(other),
        })
    }

    /// Resolve a public (portfolio/series) gallery by slug. Client galleries
    /// are never reachable this way, and expiry applies here too.
    pub async fn resolve_public(&self, slug: &str) -> GalleryResult<Gallery> {
        let gallery = sqlx::query_as::<_, Gallery>(&format!(
            "SELECT {GALLERY_COLUMNS} FROM galleries
             WHERE slug = ? AND is_published = 1 AND kind != 'client'"
        ))
        .bind(slug)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => GalleryError::NotFound(slug.to_string()),
            other => GalleryError::Sqlx(other),
        })?;
        if gallery.is_expired(Utc::now()) {
            return Err(GalleryError::Expired);
        }
        Ok(gallery)
    }

    /// Resolve a client gallery by its access token. Expiry is checked
    /// before anything else: an expired link is terminal, password grants
    /// notwithstanding.
    pub async fn resolve_client(&self, token: &str) -> GalleryResult<Gallery> {
        let gallery = sqlx::query_as::<_, Gallery>(&format!(
            "SELECT {GALLERY_COLUMNS} FROM galleries WHERE access_token = ?"
        ))
        .bind(token)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => GalleryError::NotFound(token.to_string()),
            other => GalleryError::Sqlx(other),
        })?;
        if gallery.is_expired(Utc::now()) {
            return Err(GalleryError::Expired);
        }
        Ok(gallery)
    }

    /// Check a submitted password against the stored hash.
    pub fn check_password(&self, gallery: &Gallery, submitted: &str) -> GalleryResult<()> {
        match &gallery.password_hash {
            None => Ok(()),
            Some(hash) if verify_password(hash, submitted) => Ok(()),
            Some(_) => Err(GalleryError::WrongPassword),
        }
    }

    /// Bump view_count and stamp last_accessed_at after a successful view.
    pub async fn record_view(&self, id: Uuid) -> GalleryResult<()> {
        sqlx::query(
            "UPDATE galleries SET view_count = view_count + 1, last_accessed_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    /// Replace the access token; old links stop working immediately.
    pub async fn regenerate_token(&self, id: Uuid) -> GalleryResult<Gallery> {
        let affected = sqlx::query(
            "UPDATE galleries SET access_token = ?, updated_at = ? WHERE id = ?",
        )
        .bind(generate_access_token())
        .bind(Utc::now())
        .bind(id)
        .execute(&*self.db)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(GalleryError::NotFound(id.to_string()));
        }
        self.get(id).await
    }

    /// Set or clear the gallery password.
    pub async fn set_password(&self, id: Uuid, password: Option<&str>) -> GalleryResult<()> {
        let hash = password.map(hash_password);
        let affected = sqlx::query(
            "UPDATE galleries SET password_hash = ?, updated_at = ? WHERE id = ?",
        )
        .bind(hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&*self.db)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(GalleryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn list(&self, published_only: bool) -> GalleryResult<Vec<Gallery>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {GALLERY_COLUMNS} FROM galleries"
        ));
        if published_only {
            builder.push(" WHERE is_published = 1 AND kind != 'client'");
        }
        builder.push(" ORDER BY created_at DESC");
        Ok(builder.build_query_as().fetch_all(&*self.db).await?)
    }

    pub async fn photos_in(&self, gallery_id: Uuid) -> GalleryResult<Vec<Photo>> {
        Ok(sqlx::query_as::<_, Photo>(
            "SELECT p.id, p.title, p.slug, p.description, p.alt_text, p.original_path,
                    p.optimized_path, p.watermarked_path, p.thumbnail_path, p.content_type,
                    p.size_bytes, p.etag, p.width, p.height, p.camera, p.lens, p.focal_length,
                    p.aperture, p.shutter_speed, p.iso, p.location, p.taken_at, p.category_id,
                    p.is_published, p.is_featured, p.processing_status, p.like_count,
                    p.view_count, p.created_at, p.updated_at
             FROM photos p
             JOIN gallery_photos gp ON gp.photo_id = p.id
             WHERE gp.gallery_id = ?
             ORDER BY gp.sort_order ASC, p.slug ASC",
        )
        .bind(gallery_id)
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn attach_photo(
        &self,
        gallery_id: Uuid,
        photo_id: Uuid,
        sort_order: i64,
    ) -> GalleryResult<()> {
        let insert = sqlx::query(
            "INSERT INTO gallery_photos (gallery_id, photo_id, sort_order) VALUES (?, ?, ?)",
        )
        .bind(gallery_id)
        .bind(photo_id)
        .bind(sort_order)
        .execute(&*self.db)
        .await;
        match insert {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                sqlx::query(
                    "UPDATE gallery_photos SET sort_order = ? WHERE gallery_id = ? AND photo_id = ?",
                )
                .bind(sort_order)
                .bind(gallery_id)
                .bind(photo_id)
                .execute(&*self.db)
                .await?;
                Ok(())
            }
            Err(err) => Err(GalleryError::Sqlx(err)),
        }
    }

    pub async fn detach_photo(&self, gallery_id: Uuid, photo_id: Uuid) -> GalleryResult<()> {
        sqlx::query("DELETE FROM gallery_photos WHERE gallery_id = ? AND photo_id = ?")
            .bind(gallery_id)
            .bind(photo_id)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    /// Membership check used by the client download path.
    pub async fn contains_photo(&self, gallery_id: Uuid, photo_id: Uuid) -> GalleryResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM gallery_photos WHERE gallery_id = ? AND photo_id = ?",
        )
        .bind(gallery_id)
        .bind(photo_id)
        .fetch_one(&*self.db)
        .await?;
        Ok(count > 0)
    }

    async fn unique_slug(&self, base: &str) -> GalleryResult<String> {
        let base = if base.is_empty() { "gallery" } else { base };
        let mut candidate = base.to_string();
        let mut n = 2;
        loop {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM galleries WHERE slug = ?")
                .bind(&candidate)
                .fetch_one(&*self.db)
                .await?;
            if exists == 0 {
                return Ok(candidate);
            }
            candidate = format!("{base}-{n}");
            n += 1;
        }
    }
}

/// Opaque 32-hex-char token for client links.
fn generate_access_token() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Salted SHA-256, stored as `salt$digest` hex.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 8];
    rand::rng().fill_bytes(&mut salt);
    let salt_hex: String = salt.iter().map(|b| format!("{:02x}", b)).collect();
    let digest = Sha256::digest(format!("{salt_hex}{password}"));
    let digest_hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{salt_hex}${digest_hex}")
}

pub fn verify_password(stored: &str, submitted: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let digest = Sha256::digest(format!("{salt_hex}{submitted}"));
    let computed: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    computed == digest_hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("proofs-2026");
        assert!(verify_password(&hash, "proofs-2026"));
        assert!(!verify_password(&hash, "proofs-2027"));
        assert!(!verify_password("garbage-without-separator", "anything"));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn access_tokens_are_opaque_hex() {
        let token = generate_access_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
