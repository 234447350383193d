//! Handlers for public galleries and the client proofing flow.
//!
//! A client gallery link resolves by access token. Expiry is terminal and
//! checked first; a password-protected gallery then needs a session grant
//! before any content (or downloads/selections) is served.

use crate::{
    errors::AppError,
    handlers::{client_ip, photo_handlers::stream_file},
    models::{gallery::Gallery, photo::Photo},
    services::{
        gallery_service::{GalleryError, NewGallery, UpdateGallery},
        media_store::MediaKind,
        rate_limit_service,
    },
    session,
    state::AppState,
};
use axum::{
    Json,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use tower_sessions::Session;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct GalleryViewResponse {
    #[serde(flatten)]
    pub gallery: Gallery,
    pub photos: Vec<Photo>,
}

/// GET `/api/galleries` — published portfolio/series galleries.
pub async fn list_galleries(
    State(state): State<AppState>,
) -> Result<Json<Vec<Gallery>>, AppError> {
    Ok(Json(state.galleries.list(true).await?))
}

/// GET `/api/galleries/{slug}` — a published public gallery with photos.
pub async fn get_gallery(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<GalleryViewResponse>, AppError> {
    let gallery = state.galleries.resolve_public(&slug).await?;
    let photos = state.galleries.photos_in(gallery.id).await?;
    state.galleries.record_view(gallery.id).await?;
    Ok(Json(GalleryViewResponse { gallery, photos }))
}

/// GET `/api/client/{token}` — client gallery view.
///
/// Expired links 403 before anything else. Password-protected galleries
/// 401 until the session holds a grant. A successful view bumps the
/// counters.
pub async fn view_client_gallery(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
) -> Result<Json<GalleryViewResponse>, AppError> {
    let gallery = state.galleries.resolve_client(&token).await?;
    ensure_unlocked(&session, &gallery).await?;
    let photos = state.galleries.photos_in(gallery.id).await?;
    state.galleries.record_view(gallery.id).await?;
    Ok(Json(GalleryViewResponse { gallery, photos }))
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

/// POST `/api/client/{token}/password` — verify the gallery password and
/// record the grant in the session on success.
pub async fn submit_password(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    Json(req): Json<PasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let gallery = state.galleries.resolve_client(&token).await?;
    state.galleries.check_password(&gallery, &req.password)?;
    session::record_password_grant(&session, gallery.id).await?;
    Ok(Json(json!({ "granted": true })))
}

/// GET `/api/client/{token}/photos/{photo_id}/download` — rate-limited
/// download of a gallery photo, gated on `allow_downloads`.
pub async fn download_gallery_photo(
    State(state): State<AppState>,
    session: Session,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path((token, photo_id)): Path<(String, Uuid)>,
) -> Result<Response, AppError> {
    let gallery = state.galleries.resolve_client(&token).await?;
    ensure_unlocked(&session, &gallery).await?;
    if !gallery.allow_downloads {
        return Err(GalleryError::DownloadsDisabled.into());
    }
    if !state.galleries.contains_photo(gallery.id, photo_id).await? {
        return Err(AppError::not_found("photo is not part of this gallery"));
    }
    state
        .limiter
        .check(rate_limit_service::DOWNLOADS, &client_ip(&headers, &addr))
        .await?;

    let photo = state.catalog.get_photo(photo_id).await?;
    let (file, len, content_type) = state.catalog.open_media(&photo, MediaKind::Optimized).await?;
    Ok(stream_file(file, len, &content_type))
}

/// Reject with 401 until the session holds a grant for a password-protected
/// gallery. Galleries without a password are always unlocked.
pub(crate) async fn ensure_unlocked(session: &Session, gallery: &Gallery) -> Result<(), AppError> {
    if gallery.is_password_protected()
        && !session::has_password_grant(session, gallery.id).await?
    {
        return Err(GalleryError::PasswordRequired.into());
    }
    Ok(())
}

// --- Admin surface ---

/// GET `/api/admin/galleries` — every gallery, client ones included.
pub async fn admin_list_galleries(
    State(state): State<AppState>,
) -> Result<Json<Vec<Gallery>>, AppError> {
    Ok(Json(state.galleries.list(false).await?))
}

/// POST `/api/admin/galleries`
pub async fn create_gallery(
    State(state): State<AppState>,
    Json(req): Json<NewGallery>,
) -> Result<(StatusCode, Json<Gallery>), AppError> {
    let gallery = state.galleries.create(req).await?;
    Ok((StatusCode::CREATED, Json(gallery)))
}

/// PATCH `/api/admin/galleries/{id}`
pub async fn update_gallery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateGallery>,
) -> Result<Json<Gallery>, AppError> {
    Ok(Json(state.galleries.update(id, req).await?))
}

/// DELETE `/api/admin/galleries/{id}`
pub async fn delete_gallery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.galleries.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/api/admin/galleries/{id}/regenerate-token`
pub async fn regenerate_gallery_token(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Gallery>, AppError> {
    Ok(Json(state.galleries.regenerate_token(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    /// Null clears the password.
    pub password: Option<String>,
}

/// PUT `/api/admin/galleries/{id}/password`
pub async fn set_gallery_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    state
        .galleries
        .set_password(id, req.password.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AttachPhotoRequest {
    pub photo_id: Uuid,
    #[serde(default)]
    pub sort_order: i64,
}

/// POST `/api/admin/galleries/{id}/photos`
pub async fn attach_gallery_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AttachPhotoRequest>,
) -> Result<StatusCode, AppError> {
    state
        .galleries
        .attach_photo(id, req.photo_id, req.sort_order)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE `/api/admin/galleries/{id}/photos/{photo_id}`
pub async fn detach_gallery_photo(
    State(state): State<AppState>,
    Path((id, photo_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.galleries.detach_photo(id, photo_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
