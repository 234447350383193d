//! Defines routes for the portfolio and storefront API.
//!
//! ## Structure
//! - **Public site**
//!   - `/healthz`, `/readyz` — probes
//!   - `/feed.xml`, `/atom.xml`, `/sitemap.xml`, `/sitemap-images.xml`
//!   - `/api/frontpage`, `/api/photos…`, `/api/categories…`, `/api/tags`,
//!     `/api/galleries…`, `/api/posts…`
//! - **Client proofing**
//!   - `/api/client/{token}` — token-gated gallery view
//!   - `/api/client/{token}/password` — password grant
//!   - `/api/client/{token}/photos/{photo_id}/download`
//!   - `/api/selections…` — session selection set
//! - **Checkout**
//!   - `/api/checkout…` — quote, order, webhook, confirm, licensed download
//! - **Admin** (`/api/admin/…`)
//!   - bearer-token gated CRUD over photos, categories, galleries, orders,
//!     posts, comments, settings and the activity log
//!
//! The session layer wraps everything: the visitor session is the identity
//! for selections, password grants and likes.

use crate::{
    errors::AppError,
    handlers::{
        checkout_handlers, gallery_handlers,
        health_handlers::{healthz, readyz},
        photo_handlers, post_handlers, selection_handlers, site_handlers,
    },
    state::AppState,
};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
};
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::SqliteStore;

/// Largest accepted upload body.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Build the full application router.
pub fn router(state: AppState, session_store: SqliteStore) -> Router {
    let session_layer = SessionManagerLayer::new(session_store).with_secure(false);

    let admin = Router::new()
        .route(
            "/photos",
            get(photo_handlers::admin_list_photos).post(photo_handlers::upload_photo),
        )
        .route("/photos/bulk", post(photo_handlers::bulk_edit_photos))
        .route(
            "/photos/{id}",
            get(photo_handlers::admin_get_photo)
                .patch(photo_handlers::update_photo)
                .delete(photo_handlers::delete_photo),
        )
        .route("/photos/{id}/reprocess", post(photo_handlers::reprocess_photo))
        .route("/categories", post(photo_handlers::create_category))
        .route(
            "/categories/{id}",
            patch(photo_handlers::update_category).delete(photo_handlers::delete_category),
        )
        .route(
            "/galleries",
            get(gallery_handlers::admin_list_galleries).post(gallery_handlers::create_gallery),
        )
        .route(
            "/galleries/{id}",
            patch(gallery_handlers::update_gallery).delete(gallery_handlers::delete_gallery),
        )
        .route(
            "/galleries/{id}/regenerate-token",
            post(gallery_handlers::regenerate_gallery_token),
        )
        .route(
            "/galleries/{id}/password",
            put(gallery_handlers::set_gallery_password),
        )
        .route(
            "/galleries/{id}/photos",
            post(gallery_handlers::attach_gallery_photo),
        )
        .route(
            "/galleries/{id}/photos/{photo_id}",
            delete(gallery_handlers::detach_gallery_photo),
        )
        .route("/orders", get(checkout_handlers::admin_list_orders))
        .route(
            "/orders/{id}/status",
            patch(checkout_handlers::advance_order_status),
        )
        .route("/orders/{id}/refund", post(checkout_handlers::refund_order))
        .route(
            "/posts",
            get(post_handlers::admin_list_posts).post(post_handlers::create_post),
        )
        .route(
            "/posts/{id}",
            patch(post_handlers::update_post).delete(post_handlers::delete_post),
        )
        .route("/comments", get(post_handlers::pending_comments))
        .route("/comments/{id}", delete(post_handlers::delete_comment))
        .route("/comments/{id}/approve", post(post_handlers::approve_comment))
        .route("/settings", get(site_handlers::list_settings))
        .route(
            "/settings/{key}",
            put(site_handlers::put_setting).delete(site_handlers::delete_setting),
        )
        .route("/activity", get(site_handlers::list_activity))
        .route("/inquiries", get(site_handlers::list_inquiries))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new()
        // probes
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // feeds & sitemaps
        .route("/feed.xml", get(site_handlers::rss_feed))
        .route("/atom.xml", get(site_handlers::atom_feed))
        .route("/sitemap.xml", get(site_handlers::sitemap))
        .route("/sitemap-images.xml", get(site_handlers::image_sitemap))
        // public catalog
        .route("/api/frontpage", get(site_handlers::frontpage))
        .route("/api/photos", get(photo_handlers::list_photos))
        .route("/api/photos/{slug}", get(photo_handlers::get_photo))
        .route(
            "/api/photos/{slug}/image/{variant}",
            get(photo_handlers::get_photo_image),
        )
        .route("/api/photos/{slug}/like", post(photo_handlers::toggle_like))
        .route(
            "/api/photos/{slug}/inquiry",
            post(photo_handlers::create_inquiry),
        )
        .route("/api/categories", get(photo_handlers::list_categories))
        .route("/api/categories/{slug}", get(photo_handlers::get_category))
        .route("/api/tags", get(photo_handlers::list_tags))
        // public & client galleries
        .route("/api/galleries", get(gallery_handlers::list_galleries))
        .route("/api/galleries/{slug}", get(gallery_handlers::get_gallery))
        .route(
            "/api/client/{token}",
            get(gallery_handlers::view_client_gallery),
        )
        .route(
            "/api/client/{token}/password",
            post(gallery_handlers::submit_password),
        )
        .route(
            "/api/client/{token}/photos/{photo_id}/download",
            get(gallery_handlers::download_gallery_photo),
        )
        // selections
        .route(
            "/api/selections",
            get(selection_handlers::list_selections)
                .delete(selection_handlers::clear_selections),
        )
        .route(
            "/api/selections/toggle",
            post(selection_handlers::toggle_selection),
        )
        .route(
            "/api/selections/export",
            get(selection_handlers::export_selections),
        )
        .route(
            "/api/selections/submit",
            post(selection_handlers::submit_selections),
        )
        // checkout
        .route("/api/checkout/quote", get(checkout_handlers::quote))
        .route("/api/checkout", post(checkout_handlers::create_order))
        .route("/api/checkout/webhook", post(checkout_handlers::webhook))
        .route(
            "/api/checkout/confirm/{order_number}",
            get(checkout_handlers::confirm),
        )
        .route(
            "/api/checkout/download/{order_number}",
            get(checkout_handlers::licensed_download),
        )
        // blog
        .route("/api/posts", get(post_handlers::list_posts))
        .route("/api/posts/{slug}", get(post_handlers::get_post))
        .route(
            "/api/posts/{slug}/comments",
            post(post_handlers::add_comment),
        )
        .nest("/api/admin", admin)
        .layer(session_layer)
        .with_state(state)
}

/// Reject any request whose bearer token does not match the configured
/// admin token. With no token configured, the admin surface is closed.
async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let authorized = match (state.cfg.admin_token.as_deref(), presented) {
        (Some(expected), Some(token)) => expected == token,
        _ => false,
    };
    if !authorized {
        return AppError::unauthorized("admin token required").into_response();
    }
    next.run(request).await
}
