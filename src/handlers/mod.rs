//! HTTP handlers. Thin: extract, delegate to a service, shape the response.

pub mod checkout_handlers;
pub mod gallery_handlers;
pub mod health_handlers;
pub mod photo_handlers;
pub mod post_handlers;
pub mod selection_handlers;
pub mod site_handlers;

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Client address used for rate-limit scoping: first X-Forwarded-For hop
/// when present (reverse-proxy deployments), else the socket peer.
pub fn client_ip(headers: &HeaderMap, addr: &SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}
