//! CatalogService — photos, categories and tags backed by SQLite for
//! metadata and `MediaStore` for payloads. Variant generation runs on a
//! spawned blocking task after upload; the photo row carries its state.

use crate::{
    errors::AppError,
    models::photo::{Category, Photo, ProcessingStatus, Tag},
    services::{
        is_unique_violation,
        media_store::{MediaError, MediaKind, MediaStore},
    },
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Deserialize;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{io, sync::Arc};
use thiserror::Error;
use tokio::fs::File;
use tracing::warn;
use uuid::Uuid;

const PHOTO_COLUMNS: &str = "id, title, slug, description, alt_text, original_path, \
     optimized_path, watermarked_path, thumbnail_path, content_type, size_bytes, etag, \
     width, height, camera, lens, focal_length, aperture, shutter_speed, iso, location, \
     taken_at, category_id, is_published, is_featured, processing_status, like_count, \
     view_count, created_at, updated_at";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("photo `{0}` not found")]
    PhotoNotFound(String),
    #[error("category `{0}` not found")]
    CategoryNotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::PhotoNotFound(_) | CatalogError::CategoryNotFound(_) => {
                AppError::not_found(err.to_string())
            }
            CatalogError::Validation(msg) => AppError::validation(msg),
            CatalogError::Media(MediaError::NotFound(_)) => AppError::not_found(err.to_string()),
            CatalogError::Media(_) => AppError::internal(err.to_string()),
            CatalogError::Sqlx(sqlx::Error::RowNotFound) => AppError::not_found("not found"),
            CatalogError::Sqlx(other) => AppError::internal(other.to_string()),
        }
    }
}

/// Metadata accompanying a photo upload.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NewPhoto {
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub alt_text: Option<String>,
    pub camera: Option<String>,
    pub lens: Option<String>,
    pub focal_length: Option<String>,
    pub aperture: Option<String>,
    pub shutter_speed: Option<String>,
    pub iso: Option<String>,
    pub location: Option<String>,
    pub taken_at: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct UpdatePhoto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub alt_text: Option<String>,
    pub camera: Option<String>,
    pub lens: Option<String>,
    pub focal_length: Option<String>,
    pub aperture: Option<String>,
    pub shutter_speed: Option<String>,
    pub iso: Option<String>,
    pub location: Option<String>,
    pub taken_at: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
    pub is_published: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Changes applied to many photos at once from the bulk-edit screen.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct BulkEdit {
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub clear_category: bool,
    pub is_published: Option<bool>,
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub add_tags: Vec<String>,
}

/// Filters for the public photo listing.
#[derive(Debug, Default, Clone)]
pub struct PhotoQuery {
    pub category_slug: Option<String>,
    pub tag_slug: Option<String>,
    pub featured_only: bool,
    pub search: Option<String>,
    pub published_only: bool,
    pub cursor: Option<String>,
    pub max_items: usize,
}

#[derive(Debug)]
pub struct PhotoPage {
    pub photos: Vec<Photo>,
    pub is_truncated: bool,
    pub next_cursor: Option<String>,
}

/// Outcome of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked(i64),
    Unliked(i64),
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<SqlitePool>,
    pub media: MediaStore,
}

impl CatalogService {
    pub fn new(db: Arc<SqlitePool>, media: MediaStore) -> Self {
        Self { db, media }
    }

    /// Stream an uploaded original to disk and insert the photo row in
    /// `pending` state. Variant generation is kicked off separately via
    /// [`CatalogService::spawn_processing`].
    pub async fn create_photo<S>(
        &self,
        meta: NewPhoto,
        extension: &str,
        content_type: Option<String>,
        stream: S,
    ) -> CatalogResult<Photo>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        if meta.title.trim().is_empty() {
            return Err(CatalogError::Validation("title is required".into()));
        }

        let id = Uuid::new_v4();
        let slug = match meta.slug {
            Some(s) => self.unique_slug("photos", &slugify(&s)).await?,
            None => self.unique_slug("photos", &slugify(&meta.title)).await?,
        };
        let filename = format!("{}.{}", id, extension);
        let stored = self.media.write_original_stream(&filename, stream).await?;

        let now = Utc::now();
        let insert = sqlx::query_as::<_, Photo>(&format!(
            "INSERT INTO photos (
                id, title, slug, description, alt_text, original_path, optimized_path,
                watermarked_path, thumbnail_path, content_type, size_bytes, etag,
                width, height, camera, lens, focal_length, aperture, shutter_speed, iso,
                location, taken_at, category_id, is_published, is_featured,
                processing_status, like_count, view_count, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, NULL, NULL, NULL, ?, ?, ?, NULL, NULL, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, 0, 0, ?, ?)
            RETURNING {PHOTO_COLUMNS}"
        ))
        .bind(id)
        .bind(meta.title.trim())
        .bind(&slug)
        .bind(meta.description)
        .bind(meta.alt_text)
        .bind(&stored.relative_path)
        .bind(content_type)
        .bind(stored.size_bytes)
        .bind(&stored.etag)
        .bind(meta.camera)
        .bind(meta.lens)
        .bind(meta.focal_length)
        .bind(meta.aperture)
        .bind(meta.shutter_speed)
        .bind(meta.iso)
        .bind(meta.location)
        .bind(meta.taken_at)
        .bind(meta.category_id)
        .bind(ProcessingStatus::Pending)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await;

        match insert {
            Ok(photo) => Ok(photo),
            Err(err) => {
                self.media.remove(&stored.relative_path).await;
                Err(CatalogError::Sqlx(err))
            }
        }
    }

    /// Generate variants on a blocking task and record the result on the
    /// photo row. Failures leave the row `failed` for a manual re-run.
    pub fn spawn_processing(&self, photo_id: Uuid) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(err) = service.process_photo(photo_id).await {
                warn!("variant generation for photo {} failed: {}", photo_id, err);
                let _ = sqlx::query(
                    "UPDATE photos SET processing_status = ?, updated_at = ? WHERE id = ?",
                )
                .bind(ProcessingStatus::Failed)
                .bind(Utc::now())
                .bind(photo_id)
                .execute(&*service.db)
                .await;
            }
        });
    }

    async fn process_photo(&self, photo_id: Uuid) -> CatalogResult<()> {
        let photo = self.get_photo(photo_id).await?;
        let media = self.media.clone();
        let original = photo.original_path.clone();
        let stem = photo.id.to_string();
        let variants = tokio::task::spawn_blocking(move || media.generate_variants(&original, &stem))
            .await
            .map_err(|e| CatalogError::Validation(format!("processing task panicked: {e}")))??;

        sqlx::query(
            "UPDATE photos SET optimized_path = ?, watermarked_path = ?, thumbnail_path = ?,
                 width = ?, height = ?, processing_status = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&variants.optimized)
        .bind(&variants.watermarked)
        .bind(&variants.thumbnail)
        .bind(variants.width as i64)
        .bind(variants.height as i64)
        .bind(ProcessingStatus::Ready)
        .bind(Utc::now())
        .bind(photo_id)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    /// Reset a photo to `pending` and re-run variant generation.
    pub async fn reprocess(&self, photo_id: Uuid) -> CatalogResult<()> {
        let affected = sqlx::query(
            "UPDATE photos SET processing_status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(ProcessingStatus::Pending)
        .bind(Utc::now())
        .bind(photo_id)
        .execute(&*self.db)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(CatalogError::PhotoNotFound(photo_id.to_string()));
        }
        self.spawn_processing(photo_id);
        Ok(())
    }

    pub async fn get_photo(&self, id: Uuid) -> CatalogResult<Photo> {
        sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => CatalogError::PhotoNotFound(id.to_string()),
            other => CatalogError::Sqlx(other),
        })
    }

    pub async fn get_photo_by_slug(&self, slug: &str, published_only: bool) -> CatalogResult<Photo> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE slug = "
        ));
        builder.push_bind(slug);
        if published_only {
            builder.push(" AND is_published = 1");
        }
        builder
            .build_query_as::<Photo>()
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => CatalogError::PhotoNotFound(slug.to_string()),
                other => CatalogError::Sqlx(other),
            })
    }

    /// List photos with filters and cursor paging ordered by slug. Fetches
    /// one row past the requested page size to detect truncation.
    pub async fn list_photos(&self, params: PhotoQuery) -> CatalogResult<PhotoPage> {
        let max_items = params.max_items.clamp(1, 100);
        let fetch_limit = max_items + 1;

        let columns = PHOTO_COLUMNS
            .split(", ")
            .map(|c| format!("p.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT DISTINCT {columns} FROM photos p"));
        if params.tag_slug.is_some() {
            builder.push(" JOIN photo_tags pt ON pt.photo_id = p.id JOIN tags t ON t.id = pt.tag_id");
        }
        if params.category_slug.is_some() {
            builder.push(" JOIN categories c ON c.id = p.category_id");
        }
        builder.push(" WHERE 1 = 1");
        if params.published_only {
            builder.push(" AND p.is_published = 1");
        }
        if params.featured_only {
            builder.push(" AND p.is_featured = 1");
        }
        if let Some(slug) = &params.category_slug {
            builder.push(" AND c.slug = ");
            builder.push_bind(slug);
        }
        if let Some(slug) = &params.tag_slug {
            builder.push(" AND t.slug = ");
            builder.push_bind(slug);
        }
        if let Some(term) = &params.search {
            let pattern = format!("%{}%", term);
            builder.push(" AND (p.title LIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR p.description LIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
        if let Some(cursor) = &params.cursor {
            builder.push(" AND p.slug > ");
            builder.push_bind(cursor);
        }
        builder.push(" ORDER BY p.slug ASC LIMIT ");
        builder.push_bind(fetch_limit as i64);

        let mut rows: Vec<Photo> = builder.build_query_as().fetch_all(&*self.db).await?;

        let mut is_truncated = false;
        let mut next_cursor = None;
        if rows.len() == fetch_limit {
            if let Some(last) = rows.pop() {
                next_cursor = Some(last.slug.clone());
            }
            is_truncated = true;
        }

        Ok(PhotoPage {
            photos: rows,
            is_truncated,
            next_cursor,
        })
    }

    pub async fn featured_photos(&self, limit: i64) -> CatalogResult<Vec<Photo>> {
        Ok(sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos
             WHERE is_published = 1 AND is_featured = 1 AND processing_status = 'ready'
             ORDER BY updated_at DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn published_photos(&self) -> CatalogResult<Vec<Photo>> {
        Ok(sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE is_published = 1 ORDER BY slug ASC"
        ))
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn update_photo(&self, id: Uuid, update: UpdatePhoto) -> CatalogResult<Photo> {
        let current = self.get_photo(id).await?;
        let title = update.title.unwrap_or(current.title);
        if title.trim().is_empty() {
            return Err(CatalogError::Validation("title is required".into()));
        }

        sqlx::query(
            "UPDATE photos SET title = ?, description = ?, alt_text = ?, camera = ?, lens = ?,
                 focal_length = ?, aperture = ?, shutter_speed = ?, iso = ?, location = ?,
                 taken_at = ?, category_id = ?, is_published = ?, is_featured = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(title.trim())
        .bind(update.description.or(current.description))
        .bind(update.alt_text.or(current.alt_text))
        .bind(update.camera.or(current.camera))
        .bind(update.lens.or(current.lens))
        .bind(update.focal_length.or(current.focal_length))
        .bind(update.aperture.or(current.aperture))
        .bind(update.shutter_speed.or(current.shutter_speed))
        .bind(update.iso.or(current.iso))
        .bind(update.location.or(current.location))
        .bind(update.taken_at.or(current.taken_at))
        .bind(update.category_id.or(current.category_id))
        .bind(update.is_published.unwrap_or(current.is_published))
        .bind(update.is_featured.unwrap_or(current.is_featured))
        .bind(Utc::now())
        .bind(id)
        .execute(&*self.db)
        .await?;

        self.get_photo(id).await
    }

    /// Delete the row and best-effort remove every stored variant.
    pub async fn delete_photo(&self, id: Uuid) -> CatalogResult<()> {
        let photo = self.get_photo(id).await?;
        sqlx::query("DELETE FROM photos WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        self.media.remove(&photo.original_path).await;
        for variant in [
            photo.optimized_path,
            photo.watermarked_path,
            photo.thumbnail_path,
        ]
        .into_iter()
        .flatten()
        {
            self.media.remove(&variant).await;
        }
        Ok(())
    }

    /// Apply a bulk edit to a set of photos. Returns affected row count.
    pub async fn bulk_edit(&self, ids: &[Uuid], edit: BulkEdit) -> CatalogResult<u64> {
        if ids.is_empty() {
            return Err(CatalogError::Validation("no photo ids given".into()));
        }

        let mut affected = 0u64;
        let has_field_change = edit.category_id.is_some()
            || edit.clear_category
            || edit.is_published.is_some()
            || edit.is_featured.is_some();

        if has_field_change {
            let mut builder = QueryBuilder::<Sqlite>::new("UPDATE photos SET updated_at = ");
            builder.push_bind(Utc::now());
            if edit.clear_category {
                builder.push(", category_id = NULL");
            } else if let Some(category_id) = edit.category_id {
                builder.push(", category_id = ");
                builder.push_bind(category_id);
            }
            if let Some(published) = edit.is_published {
                builder.push(", is_published = ");
                builder.push_bind(published);
            }
            if let Some(featured) = edit.is_featured {
                builder.push(", is_featured = ");
                builder.push_bind(featured);
            }
            builder.push(" WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in ids {
                separated.push_bind(*id);
            }
            builder.push(")");
            affected = builder.build().execute(&*self.db).await?.rows_affected();
        }

        for name in &edit.add_tags {
            let tag = self.ensure_tag(name).await?;
            for photo_id in ids {
                sqlx::query("INSERT OR IGNORE INTO photo_tags (photo_id, tag_id) VALUES (?, ?)")
                    .bind(photo_id)
                    .bind(tag.id)
                    .execute(&*self.db)
                    .await?;
            }
        }

        Ok(affected)
    }

    pub async fn record_photo_view(&self, id: Uuid) -> CatalogResult<()> {
        sqlx::query("UPDATE photos SET view_count = view_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    /// Toggle a session like. The unique (session, photo) constraint makes
    /// concurrent toggles settle on one of the two valid states; the
    /// denormalized count is recomputed rather than incremented to avoid
    /// drift.
    pub async fn toggle_like(&self, session_id: &str, photo_id: Uuid) -> CatalogResult<LikeOutcome> {
        let removed = sqlx::query(
            "DELETE FROM photo_likes WHERE session_id = ? AND photo_id = ?",
        )
        .bind(session_id)
        .bind(photo_id)
        .execute(&*self.db)
        .await?
        .rows_affected();

        let liked = if removed > 0 {
            false
        } else {
            let insert = sqlx::query(
                "INSERT INTO photo_likes (id, session_id, photo_id, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4())
            .bind(session_id)
            .bind(photo_id)
            .bind(Utc::now())
            .execute(&*self.db)
            .await;
            match insert {
                Ok(_) => true,
                Err(err) if is_unique_violation(&err) => true,
                Err(err) => return Err(CatalogError::Sqlx(err)),
            }
        };

        let count: i64 = sqlx::query_scalar(
            "UPDATE photos SET like_count =
                 (SELECT COUNT(*) FROM photo_likes WHERE photo_id = ?)
             WHERE id = ? RETURNING like_count",
        )
        .bind(photo_id)
        .bind(photo_id)
        .fetch_one(&*self.db)
        .await?;

        Ok(if liked {
            LikeOutcome::Liked(count)
        } else {
            LikeOutcome::Unliked(count)
        })
    }

    /// Open the requested variant for streaming, falling back to the
    /// original when a variant has not been generated.
    pub async fn open_media(
        &self,
        photo: &Photo,
        kind: MediaKind,
    ) -> CatalogResult<(File, i64, String)> {
        let (relative, content_type) = match kind {
            MediaKind::Original => (
                photo.original_path.clone(),
                photo
                    .content_type
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".into()),
            ),
            MediaKind::Optimized => match &photo.optimized_path {
                Some(p) => (p.clone(), "image/jpeg".to_string()),
                None => (photo.original_path.clone(), "image/jpeg".to_string()),
            },
            MediaKind::Watermarked => match &photo.watermarked_path {
                Some(p) => (p.clone(), "image/jpeg".to_string()),
                None => return Err(CatalogError::PhotoNotFound(photo.slug.clone())),
            },
            MediaKind::Thumbnail => match &photo.thumbnail_path {
                Some(p) => (p.clone(), "image/webp".to_string()),
                None => return Err(CatalogError::PhotoNotFound(photo.slug.clone())),
            },
        };
        let (file, len) = self.media.open(&relative).await?;
        Ok((file, len, content_type))
    }

    // --- Categories ---

    pub async fn create_category(
        &self,
        name: &str,
        description: Option<String>,
        sort_order: i64,
        is_published: bool,
    ) -> CatalogResult<Category> {
        if name.trim().is_empty() {
            return Err(CatalogError::Validation("category name is required".into()));
        }
        let slug = self.unique_slug("categories", &slugify(name)).await?;
        Ok(sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, name, slug, description, sort_order, is_published, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id, name, slug, description, sort_order, is_published, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name.trim())
        .bind(&slug)
        .bind(description)
        .bind(sort_order)
        .bind(is_published)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?)
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
        sort_order: Option<i64>,
        is_published: Option<bool>,
    ) -> CatalogResult<Category> {
        let current = self.get_category(id).await?;
        sqlx::query(
            "UPDATE categories SET name = ?, description = ?, sort_order = ?, is_published = ?
             WHERE id = ?",
        )
        .bind(name.unwrap_or(current.name))
        .bind(description.or(current.description))
        .bind(sort_order.unwrap_or(current.sort_order))
        .bind(is_published.unwrap_or(current.is_published))
        .bind(id)
        .execute(&*self.db)
        .await?;
        self.get_category(id).await
    }

    pub async fn delete_category(&self, id: Uuid) -> CatalogResult<()> {
        let affected = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(CatalogError::CategoryNotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn get_category(&self, id: Uuid) -> CatalogResult<Category> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, sort_order, is_published, created_at
             FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => CatalogError::CategoryNotFound(id.to_string()),
            other => CatalogError::Sqlx(other),
        })
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> CatalogResult<Category> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, sort_order, is_published, created_at
             FROM categories WHERE slug = ?",
        )
        .bind(slug)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => CatalogError::CategoryNotFound(slug.to_string()),
            other => CatalogError::Sqlx(other),
        })
    }

    pub async fn list_categories(&self, published_only: bool) -> CatalogResult<Vec<Category>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, name, slug, description, sort_order, is_published, created_at
             FROM categories",
        );
        if published_only {
            builder.push(" WHERE is_published = 1");
        }
        builder.push(" ORDER BY sort_order ASC, name ASC");
        Ok(builder.build_query_as().fetch_all(&*self.db).await?)
    }

    // --- Tags ---

    /// Look up a tag by slug, creating it if missing.
    pub async fn ensure_tag(&self, name: &str) -> CatalogResult<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation("tag name is required".into()));
        }
        let slug = slugify(name);
        if let Some(tag) = sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags WHERE slug = ?")
            .bind(&slug)
            .fetch_optional(&*self.db)
            .await?
        {
            return Ok(tag);
        }
        let insert = sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (id, name, slug) VALUES (?, ?, ?) RETURNING id, name, slug",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(&slug)
        .fetch_one(&*self.db)
        .await;
        match insert {
            Ok(tag) => Ok(tag),
            // Lost a race to another request inserting the same slug.
            Err(err) if is_unique_violation(&err) => Ok(sqlx::query_as::<_, Tag>(
                "SELECT id, name, slug FROM tags WHERE slug = ?",
            )
            .bind(&slug)
            .fetch_one(&*self.db)
            .await?),
            Err(err) => Err(CatalogError::Sqlx(err)),
        }
    }

    pub async fn list_tags(&self) -> CatalogResult<Vec<Tag>> {
        Ok(
            sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags ORDER BY name ASC")
                .fetch_all(&*self.db)
                .await?,
        )
    }

    pub async fn tags_for_photo(&self, photo_id: Uuid) -> CatalogResult<Vec<Tag>> {
        Ok(sqlx::query_as::<_, Tag>(
            "SELECT t.id, t.name, t.slug FROM tags t
             JOIN photo_tags pt ON pt.tag_id = t.id
             WHERE pt.photo_id = ? ORDER BY t.name ASC",
        )
        .bind(photo_id)
        .fetch_all(&*self.db)
        .await?)
    }

    /// Find a free slug by suffixing `-2`, `-3`, … on collision.
    async fn unique_slug(&self, table: &str, base: &str) -> CatalogResult<String> {
        let base = if base.is_empty() { "untitled" } else { base };
        let mut candidate = base.to_string();
        let mut n = 2;
        loop {
            let exists: i64 =
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE slug = ?"))
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

/// Lowercase, alphanumeric-and-dash slug of the input.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_dash = true;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_squeezes_and_trims() {
        assert_eq!(slugify("Golden Hour, Iceland!"), "golden-hour-iceland");
        assert_eq!(slugify("  --weird   input--  "), "weird-input");
        assert_eq!(slugify("ÅÄÖ"), "");
    }
}
