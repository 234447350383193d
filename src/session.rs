//! Typed session state for anonymous visitors.
//!
//! The server-side session is the only identity a visitor has: its id keys
//! the selection set, photo likes and rate-limit counters, and it carries
//! the password grants for protected client galleries. Grants are a single
//! typed value under one key, not ad-hoc string-keyed entries.

use crate::errors::AppError;
use tower_sessions::Session;
use uuid::Uuid;

/// Key under which the list of granted gallery ids is stored.
pub const GALLERY_GRANTS_KEY: &str = "gallery_grants";

const VISITOR_MARKER_KEY: &str = "visitor";

fn session_err(err: tower_sessions::session::Error) -> AppError {
    AppError::internal(format!("session store error: {}", err))
}

/// Stable identifier for the calling visitor.
///
/// Session ids are assigned lazily on first save, so this forces a save
/// when the session is fresh; afterwards the id is stable for its lifetime.
pub async fn visitor_id(session: &Session) -> Result<String, AppError> {
    if let Some(id) = session.id() {
        return Ok(id.to_string());
    }
    session
        .insert(VISITOR_MARKER_KEY, true)
        .await
        .map_err(session_err)?;
    session.save().await.map_err(session_err)?;
    session
        .id()
        .map(|id| id.to_string())
        .ok_or_else(|| AppError::internal("session id unavailable after save"))
}

/// Gallery ids this session holds a password grant for.
pub async fn password_grants(session: &Session) -> Result<Vec<Uuid>, AppError> {
    Ok(session
        .get::<Vec<Uuid>>(GALLERY_GRANTS_KEY)
        .await
        .map_err(session_err)?
        .unwrap_or_default())
}

pub async fn has_password_grant(session: &Session, gallery_id: Uuid) -> Result<bool, AppError> {
    Ok(password_grants(session).await?.contains(&gallery_id))
}

/// Record a correct password submission for a gallery. A new session always
/// starts with no grants.
pub async fn record_password_grant(session: &Session, gallery_id: Uuid) -> Result<(), AppError> {
    let mut grants = password_grants(session).await?;
    if !grants.contains(&gallery_id) {
        grants.push(gallery_id);
        session
            .insert(GALLERY_GRANTS_KEY, grants)
            .await
            .map_err(session_err)?;
    }
    Ok(())
}
