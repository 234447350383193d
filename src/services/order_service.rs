//! OrderService — checkout quoting, order persistence, payment-confirmation
//! transitions and the licensed-download gate.
//!
//! All state changes are guarded SQL updates: "paid" can only be entered
//! once, a license key is assigned only while it is still null, and the
//! download counter only moves while it is below its quota.

use crate::{
    errors::AppError,
    models::order::{
        DEFAULT_MAX_DOWNLOADS, LicenseTier, Order, OrderStatus, PaymentStatus, ProductType,
    },
    services::{
        fulfillment_service::ProviderProduct, is_unique_violation,
        settings_service::SettingsService,
    },
};
use chrono::{Datelike, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, order_number, photo_id, product_id, product_name, product_type, \
     price_cents, shipping_cents, tax_cents, total_cents, currency, customer_name, \
     customer_email, shipping_address, shipping_city, shipping_postal_code, shipping_country, \
     payment_status, status, payment_intent_id, license_type, license_key, license_expires_at, \
     download_count, max_downloads, paid_at, created_at, updated_at";

/// Why a licensed download was refused. Each maps to a 403 with its own
/// reason string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadDenied {
    InvalidKey,
    NotPaid,
    NotLicense,
    QuotaExhausted,
    Expired,
}

impl DownloadDenied {
    pub fn reason(self) -> &'static str {
        match self {
            DownloadDenied::InvalidKey => "invalid license key",
            DownloadDenied::NotPaid => "order has not been paid",
            DownloadDenied::NotLicense => "order does not include a digital license",
            DownloadDenied::QuotaExhausted => "download limit reached for this license",
            DownloadDenied::Expired => "license has expired",
        }
    }
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order `{0}` not found")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("cannot move order from `{from:?}` to `{to:?}`")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("{}", .0.reason())]
    Denied(DownloadDenied),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(_) => AppError::not_found(err.to_string()),
            OrderError::Validation(msg) => AppError::validation(msg),
            OrderError::InvalidTransition { .. } => AppError::validation(err.to_string()),
            OrderError::Denied(denied) => AppError::forbidden(denied.reason()),
            OrderError::Sqlx(sqlx::Error::RowNotFound) => AppError::not_found("not found"),
            OrderError::Sqlx(other) => AppError::internal(other.to_string()),
        }
    }
}

/// Shipping and tax calculators, assembled from settings so the
/// photographer can adjust them without a deploy.
#[derive(Debug, Clone)]
pub struct PricingRules {
    pub shipping_print_cents: i64,
    pub shipping_canvas_cents: i64,
    pub shipping_metal_cents: i64,
    /// Tax rate in basis points applied to the product subtotal.
    pub tax_rate_bps: i64,
}

impl PricingRules {
    pub fn shipping_for(&self, product_type: ProductType) -> i64 {
        match product_type {
            ProductType::Print => self.shipping_print_cents,
            ProductType::Canvas => self.shipping_canvas_cents,
            ProductType::Metal => self.shipping_metal_cents,
            ProductType::License => 0,
        }
    }

    pub fn tax_for(&self, subtotal_cents: i64) -> i64 {
        subtotal_cents * self.tax_rate_bps / 10_000
    }
}

/// A priced offer for one product. Pure function of catalog + rules.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub product_id: String,
    pub product_name: String,
    pub product_type: ProductType,
    pub price_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub currency: String,
}

pub fn build_quote(product: &ProviderProduct, rules: &PricingRules) -> Quote {
    let shipping = rules.shipping_for(product.product_type);
    let tax = rules.tax_for(product.price_cents);
    Quote {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        product_type: product.product_type,
        price_cents: product.price_cents,
        shipping_cents: shipping,
        tax_cents: tax,
        total_cents: product.price_cents + shipping + tax,
        currency: product.currency.clone(),
    }
}

/// Customer-submitted checkout fields.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderRequest {
    pub product_id: String,
    pub photo_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_postal_code: Option<String>,
    pub shipping_country: Option<String>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<SqlitePool>,
    settings: SettingsService,
}

impl OrderService {
    pub fn new(db: Arc<SqlitePool>, settings: SettingsService) -> Self {
        Self { db, settings }
    }

    pub async fn pricing_rules(&self) -> OrderResult<PricingRules> {
        Ok(PricingRules {
            shipping_print_cents: self
                .settings
                .get_i64("pricing.shipping_print_cents", 900)
                .await
                .map_err(OrderError::Sqlx)?,
            shipping_canvas_cents: self
                .settings
                .get_i64("pricing.shipping_canvas_cents", 2500)
                .await
                .map_err(OrderError::Sqlx)?,
            shipping_metal_cents: self
                .settings
                .get_i64("pricing.shipping_metal_cents", 2900)
                .await
                .map_err(OrderError::Sqlx)?,
            tax_rate_bps: self
                .settings
                .get_i64("pricing.tax_rate_bps", 800)
                .await
                .map_err(OrderError::Sqlx)?,
        })
    }

    /// Validate checkout fields and persist the order row. Pricing comes
    /// from the quote snapshot; for license products the tier quota is
    /// fixed here and never changes afterwards.
    pub async fn create_order(
        &self,
        req: &NewOrderRequest,
        product: &ProviderProduct,
        quote: &Quote,
    ) -> OrderResult<Order> {
        if req.customer_name.trim().is_empty() {
            return Err(OrderError::Validation("customer name is required".into()));
        }
        let email = req.customer_email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(OrderError::Validation(
                "a valid customer email is required".into(),
            ));
        }
        if product.product_type.requires_shipping() {
            let complete = [
                req.shipping_address.as_deref(),
                req.shipping_city.as_deref(),
                req.shipping_postal_code.as_deref(),
                req.shipping_country.as_deref(),
            ]
            .iter()
            .all(|f| f.is_some_and(|v| !v.trim().is_empty()));
            if !complete {
                return Err(OrderError::Validation(
                    "shipping address, city, postal code and country are required".into(),
                ));
            }
        }

        let (license_type, max_downloads) = if product.product_type == ProductType::License {
            let tier = product
                .license_type
                .as_deref()
                .and_then(LicenseTier::from_provider);
            (
                tier,
                tier.map(LicenseTier::max_downloads)
                    .unwrap_or(DEFAULT_MAX_DOWNLOADS),
            )
        } else {
            (None, 0)
        };

        let now = Utc::now();
        // Retry on the rare order-number collision; uniqueness is enforced
        // by the table either way.
        for _ in 0..5 {
            let order_number = generate_order_number();
            let insert = sqlx::query_as::<_, Order>(&format!(
                "INSERT INTO orders (
                    id, order_number, photo_id, product_id, product_name, product_type,
                    price_cents, shipping_cents, tax_cents, total_cents, currency,
                    customer_name, customer_email, shipping_address, shipping_city,
                    shipping_postal_code, shipping_country, payment_status, status,
                    payment_intent_id, license_type, license_key, license_expires_at,
                    download_count, max_downloads, paid_at, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, NULL, NULL, 0, ?, NULL, ?, ?)
                RETURNING {ORDER_COLUMNS}"
            ))
            .bind(Uuid::new_v4())
            .bind(&order_number)
            .bind(req.photo_id)
            .bind(&product.id)
            .bind(&product.name)
            .bind(product.product_type)
            .bind(quote.price_cents)
            .bind(quote.shipping_cents)
            .bind(quote.tax_cents)
            .bind(quote.total_cents)
            .bind(&quote.currency)
            .bind(req.customer_name.trim())
            .bind(email)
            .bind(&req.shipping_address)
            .bind(&req.shipping_city)
            .bind(&req.shipping_postal_code)
            .bind(&req.shipping_country)
            .bind(PaymentStatus::Pending)
            .bind(OrderStatus::Pending)
            .bind(license_type)
            .bind(max_downloads)
            .bind(now)
            .bind(now)
            .fetch_one(&*self.db)
            .await;
            match insert {
                Ok(order) => return Ok(order),
                Err(err) if is_unique_violation(&err) => continue,
                Err(err) => return Err(OrderError::Sqlx(err)),
            }
        }
        Err(OrderError::Validation(
            "could not allocate a unique order number".into(),
        ))
    }

    pub async fn set_payment_intent(&self, id: Uuid, intent_id: &str) -> OrderResult<()> {
        sqlx::query("UPDATE orders SET payment_intent_id = ?, updated_at = ? WHERE id = ?")
            .bind(intent_id)
            .bind(Utc::now())
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    /// Synchronous rollback used when payment-intent creation fails: the
    /// just-created order leaves no trace.
    pub async fn delete_order(&self, id: Uuid) -> OrderResult<()> {
        sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> OrderResult<Order> {
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(id)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => OrderError::NotFound(id.to_string()),
                other => OrderError::Sqlx(other),
            })
    }

    pub async fn find_by_number(&self, order_number: &str) -> OrderResult<Order> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?"
        ))
        .bind(order_number)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => OrderError::NotFound(order_number.to_string()),
            other => OrderError::Sqlx(other),
        })
    }

    pub async fn find_by_intent(&self, intent_id: &str) -> OrderResult<Order> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_intent_id = ?"
        ))
        .bind(intent_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => OrderError::NotFound(intent_id.to_string()),
            other => OrderError::Sqlx(other),
        })
    }

    /// Apply a provider-confirmed successful payment.
    ///
    /// Idempotent: the paid transition only fires while payment_status is
    /// still pending, and the license key is only written while null. A
    /// second confirmation (double webhook, manual re-check) changes
    /// nothing.
    pub async fn confirm_paid(&self, id: Uuid) -> OrderResult<Order> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE orders SET payment_status = ?, status = ?, paid_at = ?, updated_at = ?
             WHERE id = ? AND payment_status = ?",
        )
        .bind(PaymentStatus::Paid)
        .bind(OrderStatus::Confirmed)
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(PaymentStatus::Pending)
        .execute(&*self.db)
        .await?;

        let order = self.get(id).await?;
        if order.product_type == ProductType::License
            && order.license_key.is_none()
            && order.payment_status == PaymentStatus::Paid
        {
            sqlx::query(
                "UPDATE orders SET license_key = ?, license_expires_at = ?, updated_at = ?
                 WHERE id = ? AND license_key IS NULL AND payment_status = ?",
            )
            .bind(generate_license_key())
            .bind(now + Duration::days(365))
            .bind(now)
            .bind(id)
            .bind(PaymentStatus::Paid)
            .execute(&*self.db)
            .await?;
        }
        self.get(id).await
    }

    /// Run the licensed-download checks in their required order.
    pub fn authorize_download(&self, order: &Order, supplied_key: &str) -> OrderResult<()> {
        if order.license_key.as_deref() != Some(supplied_key) {
            return Err(OrderError::Denied(DownloadDenied::InvalidKey));
        }
        if order.payment_status != PaymentStatus::Paid {
            return Err(OrderError::Denied(DownloadDenied::NotPaid));
        }
        if order.product_type != ProductType::License {
            return Err(OrderError::Denied(DownloadDenied::NotLicense));
        }
        if order.download_count >= order.max_downloads {
            return Err(OrderError::Denied(DownloadDenied::QuotaExhausted));
        }
        if let Some(expires_at) = order.license_expires_at {
            if expires_at < Utc::now() {
                return Err(OrderError::Denied(DownloadDenied::Expired));
            }
        }
        Ok(())
    }

    /// Consume one download. The quota guard sits in the WHERE clause, so a
    /// request racing past `authorize_download` still cannot push the
    /// counter over `max_downloads`.
    pub async fn consume_download(&self, id: Uuid) -> OrderResult<()> {
        let affected = sqlx::query(
            "UPDATE orders SET download_count = download_count + 1, updated_at = ?
             WHERE id = ? AND download_count < max_downloads",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&*self.db)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(OrderError::Denied(DownloadDenied::QuotaExhausted));
        }
        Ok(())
    }

    /// Advance the fulfillment status along the allowed chain.
    pub async fn advance_status(&self, id: Uuid, next: OrderStatus) -> OrderResult<Order> {
        let order = self.get(id).await?;
        if !order.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: next,
            });
        }
        sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(next)
            .bind(Utc::now())
            .bind(id)
            .bind(order.status)
            .execute(&*self.db)
            .await?;
        self.get(id).await
    }

    /// Mark a paid order refunded. Entitlements are not restored.
    pub async fn mark_refunded(&self, id: Uuid) -> OrderResult<Order> {
        let affected = sqlx::query(
            "UPDATE orders SET payment_status = ?, updated_at = ? WHERE id = ? AND payment_status = ?",
        )
        .bind(PaymentStatus::Refunded)
        .bind(Utc::now())
        .bind(id)
        .bind(PaymentStatus::Paid)
        .execute(&*self.db)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(OrderError::Validation(
                "only paid orders can be refunded".into(),
            ));
        }
        self.get(id).await
    }

    pub async fn list(&self, limit: i64) -> OrderResult<Vec<Order>> {
        Ok(sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(limit.clamp(1, 500))
        .fetch_all(&*self.db)
        .await?)
    }
}

/// `GS-YYYYMMDD-XXXXXX`, suffix from three random bytes.
fn generate_order_number() -> String {
    let now = Utc::now();
    let mut suffix = [0u8; 3];
    rand::rng().fill_bytes(&mut suffix);
    format!(
        "GS-{:04}{:02}{:02}-{:02X}{:02X}{:02X}",
        now.year(),
        now.month(),
        now.day(),
        suffix[0],
        suffix[1],
        suffix[2]
    )
}

/// 16 cryptographically random bytes as eight dash-separated groups of four
/// uppercase hex characters.
fn generate_license_key() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    bytes
        .chunks(2)
        .map(|pair| format!("{:02X}{:02X}", pair[0], pair[1]))
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(product_type: ProductType, price: i64, license_type: Option<&str>) -> ProviderProduct {
        ProviderProduct {
            id: "prod_1".into(),
            name: "Test product".into(),
            price_cents: price,
            currency: "usd".into(),
            product_type,
            license_type: license_type.map(Into::into),
        }
    }

    fn rules() -> PricingRules {
        PricingRules {
            shipping_print_cents: 900,
            shipping_canvas_cents: 2500,
            shipping_metal_cents: 2900,
            tax_rate_bps: 800,
        }
    }

    #[test]
    fn quote_adds_shipping_and_tax() {
        let q = build_quote(&product(ProductType::Print, 12_000, None), &rules());
        assert_eq!(q.shipping_cents, 900);
        assert_eq!(q.tax_cents, 960);
        assert_eq!(q.total_cents, 12_000 + 900 + 960);
    }

    #[test]
    fn license_quotes_skip_shipping() {
        let q = build_quote(
            &product(ProductType::License, 25_000, Some("commercial")),
            &rules(),
        );
        assert_eq!(q.shipping_cents, 0);
        assert_eq!(q.total_cents, 25_000 + 2_000);
    }

    #[test]
    fn order_numbers_have_date_and_suffix() {
        let n = generate_order_number();
        let parts: Vec<&str> = n.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "GS");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn license_keys_are_grouped_hex() {
        let key = generate_license_key();
        let groups: Vec<&str> = key.split('-').collect();
        assert_eq!(groups.len(), 8);
        for group in groups {
            assert_eq!(group.len(), 4);
            assert!(group.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn tier_quotas_match_the_fixed_table() {
        assert_eq!(LicenseTier::Personal.max_downloads(), 5);
        assert_eq!(LicenseTier::Commercial.max_downloads(), 10);
        assert_eq!(LicenseTier::Extended.max_downloads(), 50);
        assert_eq!(LicenseTier::from_provider("no-such-tier"), None);
    }
}
