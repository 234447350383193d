//! SelectionService — the session-scoped proofing shortlist. Rows are keyed
//! by (session_id, photo_id) with a unique constraint; a toggle race at
//! worst loses to the constraint and lands on a valid state either way.

use crate::{
    errors::AppError,
    models::selection::SelectionExportRow,
    services::is_unique_violation,
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type SelectionResult<T> = Result<T, SelectionError>;

impl From<SelectionError> for AppError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::Sqlx(e) => AppError::internal(e.to_string()),
        }
    }
}

/// What a toggle did. `LimitReached` is a signal, not an error: the request
/// succeeds and reports that nothing changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Selected(i64),
    Deselected(i64),
    LimitReached(i64),
}

#[derive(Clone)]
pub struct SelectionService {
    db: Arc<SqlitePool>,
}

impl SelectionService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Toggle a photo in the session's selection set.
    ///
    /// An existing pairing is deleted ("deselected"). Otherwise, when a
    /// limit applies and the session is at or above it, nothing is inserted
    /// and `LimitReached` is reported; else the pairing is inserted.
    pub async fn toggle(
        &self,
        session_id: &str,
        photo_id: Uuid,
        gallery_id: Option<Uuid>,
        limit: Option<i64>,
    ) -> SelectionResult<ToggleOutcome> {
        let removed = sqlx::query(
            "DELETE FROM client_selections WHERE session_id = ? AND photo_id = ?",
        )
        .bind(session_id)
        .bind(photo_id)
        .execute(&*self.db)
        .await?
        .rows_affected();

        if removed > 0 {
            return Ok(ToggleOutcome::Deselected(self.count(session_id).await?));
        }

        if let Some(limit) = limit {
            let current = self.count(session_id).await?;
            if current >= limit {
                return Ok(ToggleOutcome::LimitReached(current));
            }
        }

        let insert = sqlx::query(
            "INSERT INTO client_selections (id, session_id, photo_id, gallery_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(photo_id)
        .bind(gallery_id)
        .bind(Utc::now())
        .execute(&*self.db)
        .await;
        match insert {
            Ok(_) => {}
            // A concurrent toggle won the insert; the photo is selected.
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(SelectionError::Sqlx(err)),
        }

        Ok(ToggleOutcome::Selected(self.count(session_id).await?))
    }

    pub async fn count(&self, session_id: &str) -> SelectionResult<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM client_selections WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_one(&*self.db)
        .await?)
    }

    pub async fn clear(&self, session_id: &str) -> SelectionResult<u64> {
        Ok(sqlx::query("DELETE FROM client_selections WHERE session_id = ?")
            .bind(session_id)
            .execute(&*self.db)
            .await?
            .rows_affected())
    }

    /// Selection rows joined with photo and gallery titles, grouped-friendly
    /// order (gallery first, then selection time).
    pub async fn export_rows(&self, session_id: &str) -> SelectionResult<Vec<SelectionExportRow>> {
        Ok(sqlx::query_as::<_, SelectionExportRow>(
            "SELECT p.title AS photo_title, p.slug AS photo_slug,
                    g.title AS gallery_title, cs.created_at
             FROM client_selections cs
             JOIN photos p ON p.id = cs.photo_id
             LEFT JOIN galleries g ON g.id = cs.gallery_id
             WHERE cs.session_id = ?
             ORDER BY g.title ASC, cs.created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&*self.db)
        .await?)
    }
}

/// Render export rows as CSV.
pub fn render_csv(rows: &[SelectionExportRow]) -> String {
    let mut out = String::from("gallery,photo_title,photo_slug,selected_at\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_escape(row.gallery_title.as_deref().unwrap_or("")),
            csv_escape(&row.photo_title),
            csv_escape(&row.photo_slug),
            row.created_at.to_rfc3339()
        ));
    }
    out
}

/// Render export rows as plain text grouped by gallery.
pub fn render_text(rows: &[SelectionExportRow]) -> String {
    let mut out = String::new();
    let mut current_gallery: Option<&str> = None;
    for row in rows {
        let gallery = row.gallery_title.as_deref().unwrap_or("(no gallery)");
        if current_gallery != Some(gallery) {
            if current_gallery.is_some() {
                out.push('\n');
            }
            out.push_str(gallery);
            out.push_str(":\n");
            current_gallery = Some(gallery);
        }
        out.push_str(&format!("  - {} ({})\n", row.photo_title, row.photo_slug));
    }
    if out.is_empty() {
        out.push_str("No photos selected.\n");
    }
    out
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(gallery: Option<&str>, title: &str, slug: &str) -> SelectionExportRow {
        SelectionExportRow {
            photo_title: title.into(),
            photo_slug: slug.into(),
            gallery_title: gallery.map(Into::into),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn csv_escapes_quotes_and_commas() {
        let rows = vec![row(Some("Smith, Wedding"), "First \"look\"", "first-look")];
        let csv = render_csv(&rows);
        assert!(csv.contains("\"Smith, Wedding\""));
        assert!(csv.contains("\"First \"\"look\"\"\""));
    }

    #[test]
    fn text_groups_by_gallery() {
        let rows = vec![
            row(Some("Alpha"), "One", "one"),
            row(Some("Alpha"), "Two", "two"),
            row(Some("Beta"), "Three", "three"),
        ];
        let text = render_text(&rows);
        assert_eq!(text.matches("Alpha:").count(), 1);
        assert_eq!(text.matches("Beta:").count(), 1);
        assert!(text.find("One").unwrap() < text.find("Beta:").unwrap());
    }

    #[test]
    fn empty_selection_renders_placeholder() {
        assert_eq!(render_text(&[]), "No photos selected.\n");
    }
}
