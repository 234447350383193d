//! Represents a print or license order and its payment/fulfillment state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// What is being sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Print,
    Canvas,
    Metal,
    License,
}

impl ProductType {
    /// Physical products need a shipping block on the order; licenses don't.
    pub fn requires_shipping(self) -> bool {
        !matches!(self, ProductType::License)
    }
}

/// Payment lifecycle of an order. `Paid` is only ever set from a
/// provider-confirmed signal (webhook or re-poll), never from client input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

/// Fulfillment lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Allowed forward transitions: the linear
    /// pending→confirmed→processing→shipped→delivered chain, with
    /// cancellation possible from any non-terminal state.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Confirmed)
            | (Confirmed, Processing)
            | (Processing, Shipped)
            | (Shipped, Delivered) => true,
            (Pending | Confirmed | Processing | Shipped, Cancelled) => true,
            _ => false,
        }
    }
}

/// License tiers and their download quotas. The quota is fixed onto the
/// order at creation time; later tier changes never affect existing orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LicenseTier {
    Personal,
    Commercial,
    Extended,
}

/// Downloads granted to an unrecognized or absent tier.
pub const DEFAULT_MAX_DOWNLOADS: i64 = 5;

impl LicenseTier {
    pub fn max_downloads(self) -> i64 {
        match self {
            LicenseTier::Personal => 5,
            LicenseTier::Commercial => 10,
            LicenseTier::Extended => 50,
        }
    }

    /// Parse the tier string the fulfillment provider attaches to license
    /// products. Unknown strings fall back to `None` (default quota).
    pub fn from_provider(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "personal" => Some(LicenseTier::Personal),
            "commercial" => Some(LicenseTier::Commercial),
            "extended" => Some(LicenseTier::Extended),
            _ => None,
        }
    }
}

/// An order for a print or a digital license of a single photo.
///
/// Pricing fields are immutable once created. For license orders the
/// license_key is assigned at most once, only after the payment is
/// provider-confirmed, and `download_count` is monotonic with no reset path.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Order {
    pub id: Uuid,

    /// Human-facing unique order number, `GS-YYYYMMDD-XXXXXX`.
    pub order_number: String,

    pub photo_id: Uuid,

    /// Provider product id this order was priced from.
    pub product_id: String,
    pub product_name: String,
    pub product_type: ProductType,

    /// Immutable pricing snapshot, integer cents.
    pub price_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub currency: String,

    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_postal_code: Option<String>,
    pub shipping_country: Option<String>,

    pub payment_status: PaymentStatus,
    pub status: OrderStatus,

    /// Provider-side intent id, set when the intent is created.
    pub payment_intent_id: Option<String>,

    pub license_type: Option<LicenseTier>,

    /// Grouped-hex license key, assigned once on first paid confirmation.
    pub license_key: Option<String>,
    pub license_expires_at: Option<DateTime<Utc>>,

    /// Downloads consumed so far. Never exceeds `max_downloads`.
    pub download_count: i64,
    pub max_downloads: i64,

    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
