//! Handlers for the session selection set: toggle, count, clear, export
//! and submission to the photographer.

use crate::{
    errors::AppError,
    handlers::gallery_handlers::ensure_unlocked,
    services::{
        gallery_service::GalleryError,
        selection_service::{ToggleOutcome, render_csv, render_text},
    },
    session,
    state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub photo_id: Uuid,
    pub gallery_id: Option<Uuid>,
}

/// POST `/api/selections/toggle`
///
/// With a gallery id the gallery must be unlocked for this session and
/// allow selections, and its selection_limit (if any) caps the session's
/// set; hitting the cap reports `limit_reached` rather than erroring.
pub async fn toggle_selection(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let visitor = session::visitor_id(&session).await?;
    state.catalog.get_photo(req.photo_id).await?;

    let limit = match req.gallery_id {
        Some(gallery_id) => {
            let gallery = state.galleries.get(gallery_id).await?;
            if gallery.is_expired(chrono::Utc::now()) {
                return Err(GalleryError::Expired.into());
            }
            ensure_unlocked(&session, &gallery).await?;
            if !gallery.allow_selections {
                return Err(GalleryError::SelectionsDisabled.into());
            }
            if !state
                .galleries
                .contains_photo(gallery.id, req.photo_id)
                .await?
            {
                return Err(AppError::not_found("photo is not part of this gallery"));
            }
            gallery.selection_limit
        }
        None => None,
    };

    let outcome = state
        .selections
        .toggle(&visitor, req.photo_id, req.gallery_id, limit)
        .await?;
    let (status, count) = match outcome {
        ToggleOutcome::Selected(count) => ("selected", count),
        ToggleOutcome::Deselected(count) => ("deselected", count),
        ToggleOutcome::LimitReached(count) => ("limit_reached", count),
    };
    Ok(Json(json!({ "status": status, "count": count })))
}

/// GET `/api/selections` — current selection with count.
pub async fn list_selections(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<serde_json::Value>, AppError> {
    let visitor = session::visitor_id(&session).await?;
    let rows = state.selections.export_rows(&visitor).await?;
    let count = state.selections.count(&visitor).await?;
    Ok(Json(json!({ "count": count, "selections": rows })))
}

/// DELETE `/api/selections`
pub async fn clear_selections(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<serde_json::Value>, AppError> {
    let visitor = session::visitor_id(&session).await?;
    let removed = state.selections.clear(&visitor).await?;
    Ok(Json(json!({ "cleared": removed })))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

/// GET `/api/selections/export?format=csv|text`
pub async fn export_selections(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let visitor = session::visitor_id(&session).await?;
    let rows = state.selections.export_rows(&visitor).await?;
    let (body, content_type) = match q.format.as_deref().unwrap_or("csv") {
        "csv" => (render_csv(&rows), "text/csv; charset=utf-8"),
        "text" => (render_text(&rows), "text/plain; charset=utf-8"),
        other => {
            return Err(AppError::validation(format!(
                "unknown export format `{other}`"
            )));
        }
    };
    let mut response = body.into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub name: String,
    pub email: String,
    pub message: Option<String>,
}

/// POST `/api/selections/submit` — email the selection to the
/// photographer, reply-to the submitting visitor.
pub async fn submit_selections(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.name.trim().is_empty() || !req.email.contains('@') {
        return Err(AppError::validation("name and a valid email are required"));
    }
    let visitor = session::visitor_id(&session).await?;
    let rows = state.selections.export_rows(&visitor).await?;
    if rows.is_empty() {
        return Err(AppError::validation("no photos are selected"));
    }

    let mut body = format!(
        "Selection submitted by {} <{}>\n\n{}",
        req.name.trim(),
        req.email.trim(),
        render_text(&rows)
    );
    if let Some(message) = req.message.as_deref().filter(|m| !m.trim().is_empty()) {
        body.push_str(&format!("\nMessage:\n{}\n", message.trim()));
    }

    state
        .mailer
        .send_plain(
            &state.cfg.contact_email,
            &format!("Photo selection from {}", req.name.trim()),
            &body,
            Some(req.email.trim()),
        )
        .await?;
    state
        .activity
        .record(
            "selection_submitted",
            Some(format!("{} photos from {}", rows.len(), req.email.trim())),
        )
        .await;
    Ok(Json(json!({ "submitted": rows.len() })))
}
