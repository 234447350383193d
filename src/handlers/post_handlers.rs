//! Handlers for the blog: public posts and comments, plus admin CRUD and
//! comment moderation.

use crate::{
    errors::AppError,
    handlers::client_ip,
    models::post::{Comment, Post},
    services::{
        blog_service::{NewPost, UpdatePost},
        rate_limit_service,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

/// GET `/api/posts` — published posts, newest first.
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.blog.published_posts(50).await?))
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// GET `/api/posts/{slug}` — a published post with approved comments.
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetailResponse>, AppError> {
    let post = state.blog.get_published_by_slug(&slug).await?;
    let comments = state.blog.approved_comments(post.id).await?;
    Ok(Json(PostDetailResponse { post, comments }))
}

#[derive(Debug, Deserialize)]
pub struct NewCommentRequest {
    pub author_name: String,
    pub author_email: String,
    pub body: String,
}

/// POST `/api/posts/{slug}/comments` — rate-limited; comments are held
/// for moderation and not visible until approved.
pub async fn add_comment(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Json(req): Json<NewCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    state
        .limiter
        .check(rate_limit_service::COMMENTS, &client_ip(&headers, &addr))
        .await?;
    let post = state.blog.get_published_by_slug(&slug).await?;
    let comment = state
        .blog
        .add_comment(post.id, &req.author_name, &req.author_email, &req.body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

// --- Admin surface ---

/// GET `/api/admin/posts`
pub async fn admin_list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.blog.list_posts().await?))
}

/// POST `/api/admin/posts`
pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<NewPost>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = state.blog.create_post(req).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// PATCH `/api/admin/posts/{id}`
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePost>,
) -> Result<Json<Post>, AppError> {
    Ok(Json(state.blog.update_post(id, req).await?))
}

/// DELETE `/api/admin/posts/{id}`
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.blog.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/api/admin/comments` — comments awaiting moderation.
pub async fn pending_comments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Comment>>, AppError> {
    Ok(Json(state.blog.pending_comments().await?))
}

/// POST `/api/admin/comments/{id}/approve`
pub async fn approve_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.blog.approve_comment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE `/api/admin/comments/{id}`
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.blog.delete_comment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
