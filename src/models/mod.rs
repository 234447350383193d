//! Core data models for the portfolio and storefront.
//!
//! These entities map to database tables via `sqlx::FromRow` and serialize
//! naturally as JSON via `serde`. Status-like columns are Rust enums stored
//! as lowercase text.

pub mod activity;
pub mod gallery;
pub mod order;
pub mod photo;
pub mod post;
pub mod selection;
