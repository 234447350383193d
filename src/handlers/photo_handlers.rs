//! Handlers for the photo catalog: public browsing, image streaming, likes
//! and print inquiries, plus the admin upload/edit surface.
//! Image bodies stream from disk; nothing is buffered in memory.

use crate::{
    errors::AppError,
    handlers::client_ip,
    models::photo::{Photo, Tag},
    services::{
        catalog_service::{BulkEdit, LikeOutcome, NewPhoto, PhotoQuery, UpdatePhoto},
        media_store::MediaKind,
        rate_limit_service,
    },
    session,
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, Multipart, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{io, net::SocketAddr};
use tokio_util::io::ReaderStream;
use tower_sessions::Session;
use uuid::Uuid;

/// Query params accepted by the photo listing.
#[derive(Debug, Deserialize)]
pub struct ListPhotosQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    #[serde(default)]
    pub featured: bool,
    pub q: Option<String>,
    #[serde(rename = "max-items")]
    pub max_items: Option<usize>,
    #[serde(rename = "continuation-token")]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PhotoListResponse {
    pub photos: Vec<Photo>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PhotoDetailResponse {
    #[serde(flatten)]
    pub photo: Photo,
    pub tags: Vec<Tag>,
}

/// GET `/api/photos` — published photos with filters and cursor paging.
pub async fn list_photos(
    State(state): State<AppState>,
    Query(q): Query<ListPhotosQuery>,
) -> Result<Json<PhotoListResponse>, AppError> {
    let page = state
        .catalog
        .list_photos(PhotoQuery {
            category_slug: q.category,
            tag_slug: q.tag,
            featured_only: q.featured,
            search: q.q,
            published_only: true,
            cursor: q.continuation_token.as_deref().map(decode_continuation_token),
            max_items: q.max_items.unwrap_or(50),
        })
        .await?;
    Ok(Json(PhotoListResponse {
        is_truncated: page.is_truncated,
        next_continuation_token: page.next_cursor.as_deref().map(encode_continuation_token),
        photos: page.photos,
    }))
}

/// GET `/api/photos/{slug}` — published photo detail; bumps view_count.
pub async fn get_photo(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PhotoDetailResponse>, AppError> {
    let photo = state.catalog.get_photo_by_slug(&slug, true).await?;
    state.catalog.record_photo_view(photo.id).await?;
    let tags = state.catalog.tags_for_photo(photo.id).await?;
    Ok(Json(PhotoDetailResponse { photo, tags }))
}

/// GET `/api/photos/{slug}/image/{variant}` — stream a derived variant.
/// Originals are never served here; they are reserved for licensed and
/// gallery downloads.
pub async fn get_photo_image(
    State(state): State<AppState>,
    Path((slug, variant)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let kind = match variant.as_str() {
        "optimized" => MediaKind::Optimized,
        "watermarked" => MediaKind::Watermarked,
        "thumbnail" => MediaKind::Thumbnail,
        other => {
            return Err(AppError::not_found(format!("unknown variant `{other}`")));
        }
    };
    let photo = state.catalog.get_photo_by_slug(&slug, true).await?;
    let (file, len, content_type) = state.catalog.open_media(&photo, kind).await?;
    Ok(stream_file(file, len, &content_type))
}

/// POST `/api/photos/{slug}/like` — session-scoped like toggle.
pub async fn toggle_like(
    State(state): State<AppState>,
    session: Session,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .limiter
        .check(rate_limit_service::LIKES, &client_ip(&headers, &addr))
        .await?;
    let photo = state.catalog.get_photo_by_slug(&slug, true).await?;
    let visitor = session::visitor_id(&session).await?;
    let (liked, count) = match state.catalog.toggle_like(&visitor, photo.id).await? {
        LikeOutcome::Liked(count) => (true, count),
        LikeOutcome::Unliked(count) => (false, count),
    };
    Ok(Json(json!({ "liked": liked, "like_count": count })))
}

#[derive(Debug, Deserialize)]
pub struct InquiryRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// POST `/api/photos/{slug}/inquiry` — print inquiry; persisted and
/// forwarded to the contact address with reply-to the visitor.
pub async fn create_inquiry(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Json(req): Json<InquiryRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    state
        .limiter
        .check(rate_limit_service::INQUIRIES, &client_ip(&headers, &addr))
        .await?;
    let photo = state.catalog.get_photo_by_slug(&slug, true).await?;
    let inquiry = state
        .inquiries
        .create(Some(photo.id), &req.name, &req.email, &req.message)
        .await?;
    state
        .activity
        .record("inquiry_received", Some(format!("photo {}", photo.slug)))
        .await;

    let body = format!(
        "Print inquiry for \"{}\" ({}/photos/{})\n\nFrom: {} <{}>\n\n{}\n",
        photo.title, state.cfg.public_base_url, photo.slug, inquiry.name, inquiry.email,
        inquiry.message
    );
    if let Err(err) = state
        .mailer
        .send_plain(
            &state.cfg.contact_email,
            &format!("Print inquiry: {}", photo.title),
            &body,
            Some(&inquiry.email),
        )
        .await
    {
        // The inquiry is stored; a notification failure is logged only.
        tracing::warn!("inquiry notification email failed: {}", err);
        state
            .activity
            .record("email_failed", Some(format!("inquiry {}", inquiry.id)))
            .await;
    }

    Ok((StatusCode::CREATED, Json(json!({ "received": true }))))
}

// --- Admin surface ---

/// POST `/api/admin/photos` — multipart upload. Metadata fields must
/// precede the `file` field; the file streams straight to disk.
pub async fn upload_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Photo>), AppError> {
    let mut meta = NewPhoto::default();
    let mut created: Option<Photo> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().map(str::to_string);
                let extension = extension_for(content_type.as_deref(), field.file_name());
                let stream = futures::stream::try_unfold(&mut field, |field| async move {
                    match field.chunk().await {
                        Ok(Some(bytes)) => Ok(Some((bytes, field))),
                        Ok(None) => Ok(None),
                        Err(err) => Err(io::Error::other(err)),
                    }
                });
                created = Some(
                    state
                        .catalog
                        .create_photo(meta.clone(), &extension, content_type, stream)
                        .await?,
                );
            }
            other => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("malformed field `{other}`: {e}")))?;
                apply_text_field(&mut meta, other, value)?;
            }
        }
    }

    let photo = created.ok_or_else(|| AppError::validation("a `file` field is required"))?;
    state.catalog.spawn_processing(photo.id);
    state
        .activity
        .record("photo_uploaded", Some(photo.slug.clone()))
        .await;
    Ok((StatusCode::CREATED, Json(photo)))
}

fn apply_text_field(meta: &mut NewPhoto, name: &str, value: String) -> Result<(), AppError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Ok(());
    }
    match name {
        "title" => meta.title = value,
        "slug" => meta.slug = Some(value),
        "description" => meta.description = Some(value),
        "alt_text" => meta.alt_text = Some(value),
        "camera" => meta.camera = Some(value),
        "lens" => meta.lens = Some(value),
        "focal_length" => meta.focal_length = Some(value),
        "aperture" => meta.aperture = Some(value),
        "shutter_speed" => meta.shutter_speed = Some(value),
        "iso" => meta.iso = Some(value),
        "location" => meta.location = Some(value),
        "taken_at" => {
            meta.taken_at = Some(
                value
                    .parse::<DateTime<Utc>>()
                    .map_err(|_| AppError::validation("taken_at must be an RFC 3339 timestamp"))?,
            )
        }
        "category_id" => {
            meta.category_id = Some(
                value
                    .parse::<Uuid>()
                    .map_err(|_| AppError::validation("category_id must be a UUID"))?,
            )
        }
        _ => {}
    }
    Ok(())
}

fn extension_for(content_type: Option<&str>, file_name: Option<&str>) -> String {
    match content_type {
        Some("image/jpeg") => return "jpg".into(),
        Some("image/png") => return "png".into(),
        Some("image/webp") => return "webp".into(),
        Some("image/tiff") => return "tif".into(),
        _ => {}
    }
    file_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .unwrap_or_else(|| "jpg".into())
}

/// GET `/api/admin/photos` — listing including unpublished photos.
pub async fn admin_list_photos(
    State(state): State<AppState>,
    Query(q): Query<ListPhotosQuery>,
) -> Result<Json<PhotoListResponse>, AppError> {
    let page = state
        .catalog
        .list_photos(PhotoQuery {
            category_slug: q.category,
            tag_slug: q.tag,
            featured_only: q.featured,
            search: q.q,
            published_only: false,
            cursor: q.continuation_token.as_deref().map(decode_continuation_token),
            max_items: q.max_items.unwrap_or(50),
        })
        .await?;
    Ok(Json(PhotoListResponse {
        is_truncated: page.is_truncated,
        next_continuation_token: page.next_cursor.as_deref().map(encode_continuation_token),
        photos: page.photos,
    }))
}

/// GET `/api/admin/photos/{id}` — any photo, including its processing
/// state; this is what the admin UI polls after an upload.
pub async fn admin_get_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Photo>, AppError> {
    Ok(Json(state.catalog.get_photo(id).await?))
}

/// PATCH `/api/admin/photos/{id}`
pub async fn update_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdatePhoto>,
) -> Result<Json<Photo>, AppError> {
    Ok(Json(state.catalog.update_photo(id, update).await?))
}

/// DELETE `/api/admin/photos/{id}`
pub async fn delete_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_photo(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/api/admin/photos/{id}/reprocess` — re-run failed variant
/// generation.
pub async fn reprocess_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.catalog.reprocess(id).await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
pub struct BulkEditRequest {
    pub ids: Vec<Uuid>,
    #[serde(flatten)]
    pub edit: BulkEdit,
}

/// POST `/api/admin/photos/bulk`
pub async fn bulk_edit_photos(
    State(state): State<AppState>,
    Json(req): Json<BulkEditRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let affected = state.catalog.bulk_edit(&req.ids, req.edit).await?;
    Ok(Json(json!({ "updated": affected })))
}

// --- Categories & tags ---

/// GET `/api/categories`
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::models::photo::Category>>, AppError> {
    Ok(Json(state.catalog.list_categories(true).await?))
}

/// GET `/api/categories/{slug}`
pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<crate::models::photo::Category>, AppError> {
    Ok(Json(state.catalog.get_category_by_slug(&slug).await?))
}

/// GET `/api/tags`
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, AppError> {
    Ok(Json(state.catalog.list_tags().await?))
}

#[derive(Debug, Deserialize)]
pub struct NewCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub is_published: bool,
}

/// POST `/api/admin/categories`
pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<NewCategoryRequest>,
) -> Result<(StatusCode, Json<crate::models::photo::Category>), AppError> {
    let category = state
        .catalog
        .create_category(&req.name, req.description, req.sort_order, req.is_published)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i64>,
    pub is_published: Option<bool>,
}

/// PATCH `/api/admin/categories/{id}`
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<Json<crate::models::photo::Category>, AppError> {
    Ok(Json(
        state
            .catalog
            .update_category(id, req.name, req.description, req.sort_order, req.is_published)
            .await?,
    ))
}

/// DELETE `/api/admin/categories/{id}`
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Shared helpers ---

pub(crate) fn stream_file(file: tokio::fs::File, len: i64, content_type: &str) -> Response {
    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&len.max(0).to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    response
}

pub(crate) fn encode_continuation_token(token: &str) -> String {
    general_purpose::STANDARD.encode(token)
}

pub(crate) fn decode_continuation_token(token: &str) -> String {
    general_purpose::STANDARD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_tokens_round_trip() {
        let token = "golden-hour-iceland";
        assert_eq!(
            decode_continuation_token(&encode_continuation_token(token)),
            token
        );
    }

    #[test]
    fn garbage_tokens_pass_through() {
        assert_eq!(decode_continuation_token("%%%"), "%%%");
    }

    #[test]
    fn extension_prefers_content_type() {
        assert_eq!(extension_for(Some("image/jpeg"), Some("x.png")), "jpg");
        assert_eq!(extension_for(None, Some("photo.TIFF")), "tiff");
        assert_eq!(extension_for(None, None), "jpg");
    }
}
