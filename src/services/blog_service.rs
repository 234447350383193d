//! BlogService — posts and their comments. Published posts feed the public
//! pages, the RSS/Atom output and the sitemap; comments are held for
//! moderation.

use crate::{
    errors::AppError,
    models::post::{Comment, Post},
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const POST_COLUMNS: &str = "id, title, slug, excerpt, body, cover_photo_id, meta_title, \
     meta_description, is_published, published_at, created_at, updated_at";

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("post `{0}` not found")]
    PostNotFound(String),
    #[error("comment `{0}` not found")]
    CommentNotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type BlogResult<T> = Result<T, BlogError>;

impl From<BlogError> for AppError {
    fn from(err: BlogError) -> Self {
        match err {
            BlogError::PostNotFound(_) | BlogError::CommentNotFound(_) => {
                AppError::not_found(err.to_string())
            }
            BlogError::Validation(msg) => AppError::validation(msg),
            BlogError::Sqlx(sqlx::Error::RowNotFound) => AppError::not_found("not found"),
            BlogError::Sqlx(other) => AppError::internal(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub cover_photo_id: Option<Uuid>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    pub cover_photo_id: Option<Uuid>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Clone)]
pub struct BlogService {
    db: Arc<SqlitePool>,
}

impl BlogService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn create_post(&self, new: NewPost) -> BlogResult<Post> {
        if new.title.trim().is_empty() {
            return Err(BlogError::Validation("title is required".into()));
        }
        if new.body.trim().is_empty() {
            return Err(BlogError::Validation("body is required".into()));
        }
        let slug = self
            .unique_slug(&super::catalog_service::slugify(&new.title))
            .await?;
        let now = Utc::now();
        let published_at = new.is_published.then_some(now);
        Ok(sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (
                id, title, slug, excerpt, body, cover_photo_id, meta_title, meta_description,
                is_published, published_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {POST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.title.trim())
        .bind(&slug)
        .bind(new.excerpt)
        .bind(new.body)
        .bind(new.cover_photo_id)
        .bind(new.meta_title)
        .bind(new.meta_description)
        .bind(new.is_published)
        .bind(published_at)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?)
    }

    pub async fn update_post(&self, id: Uuid, update: UpdatePost) -> BlogResult<Post> {
        let current = self.get_post(id).await?;
        let is_published = update.is_published.unwrap_or(current.is_published);
        // Stamp published_at on the first transition to published.
        let published_at = match (current.published_at, is_published) {
            (Some(at), _) => Some(at),
            (None, true) => Some(Utc::now()),
            (None, false) => None,
        };
        sqlx::query(
            "UPDATE posts SET title = ?, excerpt = ?, body = ?, cover_photo_id = ?,
                 meta_title = ?, meta_description = ?, is_published = ?, published_at = ?,
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(update.title.unwrap_or(current.title))
        .bind(update.excerpt.or(current.excerpt))
        .bind(update.body.unwrap_or(current.body))
        .bind(update.cover_photo_id.or(current.cover_photo_id))
        .bind(update.meta_title.or(current.meta_title))
        .bind(update.meta_description.or(current.meta_description))
        .bind(is_published)
        .bind(published_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&*self.db)
        .await?;
        self.get_post(id).await
    }

    pub async fn delete_post(&self, id: Uuid) -> BlogResult<()> {
        let affected = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(BlogError::PostNotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn get_post(&self, id: Uuid) -> BlogResult<Post> {
        sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
            .bind(id)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => BlogError::PostNotFound(id.to_string()),
                other => BlogError::Sqlx(other),
            })
    }

    pub async fn get_published_by_slug(&self, slug: &str) -> BlogResult<Post> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE slug = ? AND is_published = 1"
        ))
        .bind(slug)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => BlogError::PostNotFound(slug.to_string()),
            other => BlogError::Sqlx(other),
        })
    }

    pub async fn published_posts(&self, limit: i64) -> BlogResult<Vec<Post>> {
        Ok(sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE is_published = 1
             ORDER BY published_at DESC LIMIT ?"
        ))
        .bind(limit.clamp(1, 200))
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn list_posts(&self) -> BlogResult<Vec<Post>> {
        Ok(sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC"
        ))
        .fetch_all(&*self.db)
        .await?)
    }

    // --- Comments ---

    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author_name: &str,
        author_email: &str,
        body: &str,
    ) -> BlogResult<Comment> {
        if author_name.trim().is_empty() || body.trim().is_empty() {
            return Err(BlogError::Validation("name and comment are required".into()));
        }
        if !author_email.contains('@') {
            return Err(BlogError::Validation("a valid email is required".into()));
        }
        Ok(sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (id, post_id, author_name, author_email, body, is_approved, created_at)
             VALUES (?, ?, ?, ?, ?, 0, ?)
             RETURNING id, post_id, author_name, author_email, body, is_approved, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(author_name.trim())
        .bind(author_email.trim())
        .bind(body.trim())
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?)
    }

    pub async fn approved_comments(&self, post_id: Uuid) -> BlogResult<Vec<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, author_name, author_email, body, is_approved, created_at
             FROM comments WHERE post_id = ? AND is_approved = 1 ORDER BY created_at ASC",
        )
        .bind(post_id)
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn pending_comments(&self) -> BlogResult<Vec<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, author_name, author_email, body, is_approved, created_at
             FROM comments WHERE is_approved = 0 ORDER BY created_at ASC",
        )
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn approve_comment(&self, id: Uuid) -> BlogResult<()> {
        let affected = sqlx::query("UPDATE comments SET is_approved = 1 WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(BlogError::CommentNotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn delete_comment(&self, id: Uuid) -> BlogResult<()> {
        let affected = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(BlogError::CommentNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn unique_slug(&self, base: &str) -> BlogResult<String> {
        let base = if base.is_empty() { "post" } else { base };
        let mut candidate = base.to_string();
        let mut n = 2;
        loop {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE slug = ?")
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
