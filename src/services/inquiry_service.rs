//! InquiryService — print inquiries from photo pages.

use crate::{errors::AppError, models::post::Inquiry};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum InquiryError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<InquiryError> for AppError {
    fn from(err: InquiryError) -> Self {
        match err {
            InquiryError::Validation(msg) => AppError::validation(msg),
            InquiryError::Sqlx(e) => AppError::internal(e.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct InquiryService {
    db: Arc<SqlitePool>,
}

impl InquiryService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        photo_id: Option<Uuid>,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<Inquiry, InquiryError> {
        if name.trim().is_empty() || message.trim().is_empty() {
            return Err(InquiryError::Validation("name and message are required".into()));
        }
        if !email.contains('@') {
            return Err(InquiryError::Validation("a valid email is required".into()));
        }
        Ok(sqlx::query_as::<_, Inquiry>(
            "INSERT INTO inquiries (id, photo_id, name, email, message, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id, photo_id, name, email, message, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(photo_id)
        .bind(name.trim())
        .bind(email.trim())
        .bind(message.trim())
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?)
    }

    pub async fn list(&self, limit: i64) -> Result<Vec<Inquiry>, InquiryError> {
        Ok(sqlx::query_as::<_, Inquiry>(
            "SELECT id, photo_id, name, email, message, created_at
             FROM inquiries ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit.clamp(1, 500))
        .fetch_all(&*self.db)
        .await?)
    }
}
