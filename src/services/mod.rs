//! Business logic and integration clients. Handlers stay thin and delegate
//! here; each service owns its error type and is cheap to clone.

pub mod activity_service;
pub mod blog_service;
pub mod catalog_service;
pub mod fulfillment_service;
pub mod inquiry_service;
pub mod gallery_service;
pub mod mailer_service;
pub mod media_store;
pub mod order_service;
pub mod payment_service;
pub mod rate_limit_service;
pub mod selection_service;
pub mod settings_service;

/// Return true if a SQLx error indicates a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
