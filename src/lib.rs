//! gallery-store — photography portfolio & print storefront API.
//!
//! Library root so integration tests can drive the service layer directly;
//! the binary in `main.rs` wires configuration, the database and the router
//! together.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
