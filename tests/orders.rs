//! Checkout/order/license flow: creation validation, tier quotas, the
//! idempotent paid transition and the download gate.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use gallery_store::{
    errors::AppError,
    models::order::{LicenseTier, OrderStatus, PaymentStatus, ProductType},
    services::{
        fulfillment_service::ProviderProduct,
        order_service::{
            DownloadDenied, NewOrderRequest, OrderError, OrderService, build_quote,
        },
        settings_service::SettingsService,
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

fn service(db: Arc<SqlitePool>) -> OrderService {
    OrderService::new(db.clone(), SettingsService::new(db))
}

fn product(product_type: ProductType, license_type: Option<&str>) -> ProviderProduct {
    ProviderProduct {
        id: "prod_test".into(),
        name: "Test product".into(),
        price_cents: 15_000,
        currency: "usd".into(),
        product_type,
        license_type: license_type.map(Into::into),
    }
}

fn request(photo_id: Uuid, with_shipping: bool) -> NewOrderRequest {
    NewOrderRequest {
        product_id: "prod_test".into(),
        photo_id,
        customer_name: "Ada Customer".into(),
        customer_email: "ada@example.com".into(),
        shipping_address: with_shipping.then(|| "1 Main St".into()),
        shipping_city: with_shipping.then(|| "Springfield".into()),
        shipping_postal_code: with_shipping.then(|| "12345".into()),
        shipping_country: with_shipping.then(|| "US".into()),
    }
}

async fn create_license_order(
    db: &Arc<SqlitePool>,
    orders: &OrderService,
    tier: Option<&str>,
) -> gallery_store::models::order::Order {
    let photo = common::insert_photo(db, &format!("photo-{}", Uuid::new_v4()), true).await;
    let prod = product(ProductType::License, tier);
    let rules = orders.pricing_rules().await.unwrap();
    let quote = build_quote(&prod, &rules);
    orders
        .create_order(&request(photo, false), &prod, &quote)
        .await
        .unwrap()
}

#[tokio::test]
async fn physical_orders_require_a_full_shipping_block() {
    let db = common::test_pool().await;
    let orders = service(db.clone());
    let photo = common::insert_photo(&db, "print-me", true).await;
    let prod = product(ProductType::Print, None);
    let rules = orders.pricing_rules().await.unwrap();
    let quote = build_quote(&prod, &rules);

    let err = orders
        .create_order(&request(photo, false), &prod, &quote)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));

    let order = orders
        .create_order(&request(photo, true), &prod, &quote)
        .await
        .unwrap();
    assert_eq!(order.product_type, ProductType::Print);
    assert_eq!(order.max_downloads, 0);
    assert_eq!(order.total_cents, quote.total_cents);
    assert!(order.order_number.starts_with("GS-"));
}

#[tokio::test]
async fn license_orders_skip_shipping_and_fix_the_tier_quota_at_creation() {
    let db = common::test_pool().await;
    let orders = service(db.clone());

    let commercial = create_license_order(&db, &orders, Some("commercial")).await;
    assert_eq!(commercial.license_type, Some(LicenseTier::Commercial));
    assert_eq!(commercial.max_downloads, 10);

    let personal = create_license_order(&db, &orders, Some("personal")).await;
    assert_eq!(personal.max_downloads, 5);

    let extended = create_license_order(&db, &orders, Some("extended")).await;
    assert_eq!(extended.max_downloads, 50);

    // Unknown tier strings fall back to the default quota.
    let unknown = create_license_order(&db, &orders, Some("enterprise")).await;
    assert_eq!(unknown.license_type, None);
    assert_eq!(unknown.max_downloads, 5);
}

#[tokio::test]
async fn confirm_paid_assigns_the_license_key_exactly_once() {
    let db = common::test_pool().await;
    let orders = service(db.clone());
    let order = create_license_order(&db, &orders, Some("commercial")).await;

    // Unpaid orders never carry a key.
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert!(order.license_key.is_none());

    let paid = orders.confirm_paid(order.id).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.status, OrderStatus::Confirmed);
    assert!(paid.paid_at.is_some());
    let key = paid.license_key.clone().expect("key issued on payment");
    assert!(paid.license_expires_at.unwrap() > Utc::now());

    // Double delivery (webhook + manual re-check) changes nothing.
    let again = orders.confirm_paid(order.id).await.unwrap();
    assert_eq!(again.license_key.as_deref(), Some(key.as_str()));
    assert_eq!(again.paid_at, paid.paid_at);
}

#[tokio::test]
async fn physical_orders_never_get_a_license_key() {
    let db = common::test_pool().await;
    let orders = service(db.clone());
    let photo = common::insert_photo(&db, "canvas", true).await;
    let prod = product(ProductType::Canvas, None);
    let rules = orders.pricing_rules().await.unwrap();
    let quote = build_quote(&prod, &rules);
    let order = orders
        .create_order(&request(photo, true), &prod, &quote)
        .await
        .unwrap();

    let paid = orders.confirm_paid(order.id).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert!(paid.license_key.is_none());
}

#[tokio::test]
async fn download_checks_fail_in_order_with_specific_reasons() {
    let db = common::test_pool().await;
    let orders = service(db.clone());
    let order = create_license_order(&db, &orders, Some("personal")).await;

    // Wrong key beats every other state, paid or not.
    let err = orders.authorize_download(&order, "NOT-THE-KEY").unwrap_err();
    assert!(matches!(err, OrderError::Denied(DownloadDenied::InvalidKey)));
    let app: AppError = err.into();
    assert_eq!(app.status, StatusCode::FORBIDDEN);

    let paid = orders.confirm_paid(order.id).await.unwrap();
    let key = paid.license_key.clone().unwrap();
    assert!(matches!(
        orders.authorize_download(&paid, "STILL-WRONG"),
        Err(OrderError::Denied(DownloadDenied::InvalidKey))
    ));
    assert!(orders.authorize_download(&paid, &key).is_ok());

    // An expired license refuses even with the right key.
    sqlx::query("UPDATE orders SET license_expires_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::days(1))
        .bind(paid.id)
        .execute(&*db)
        .await
        .unwrap();
    let expired = orders.get(paid.id).await.unwrap();
    assert!(matches!(
        orders.authorize_download(&expired, &key),
        Err(OrderError::Denied(DownloadDenied::Expired))
    ));
}

#[tokio::test]
async fn refunded_orders_refuse_downloads() {
    let db = common::test_pool().await;
    let orders = service(db.clone());
    let order = create_license_order(&db, &orders, Some("personal")).await;
    let paid = orders.confirm_paid(order.id).await.unwrap();
    let key = paid.license_key.clone().unwrap();

    let refunded = orders.mark_refunded(paid.id).await.unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    assert!(matches!(
        orders.authorize_download(&refunded, &key),
        Err(OrderError::Denied(DownloadDenied::NotPaid))
    ));
}

#[tokio::test]
async fn the_download_counter_never_exceeds_the_quota() {
    let db = common::test_pool().await;
    let orders = service(db.clone());
    let order = create_license_order(&db, &orders, Some("commercial")).await;
    let paid = orders.confirm_paid(order.id).await.unwrap();
    let key = paid.license_key.clone().unwrap();

    for _ in 0..10 {
        let current = orders.get(paid.id).await.unwrap();
        orders.authorize_download(&current, &key).unwrap();
        orders.consume_download(paid.id).await.unwrap();
    }
    let spent = orders.get(paid.id).await.unwrap();
    assert_eq!(spent.download_count, 10);

    // Both the pre-check and the guarded increment reject further attempts.
    assert!(matches!(
        orders.authorize_download(&spent, &key),
        Err(OrderError::Denied(DownloadDenied::QuotaExhausted))
    ));
    assert!(matches!(
        orders.consume_download(paid.id).await,
        Err(OrderError::Denied(DownloadDenied::QuotaExhausted))
    ));
    assert_eq!(orders.get(paid.id).await.unwrap().download_count, 10);
}

#[tokio::test]
async fn intent_failure_rollback_leaves_no_order_behind() {
    let db = common::test_pool().await;
    let orders = service(db.clone());
    let order = create_license_order(&db, &orders, Some("personal")).await;
    let number = order.order_number.clone();

    orders.delete_order(order.id).await.unwrap();
    assert!(matches!(
        orders.find_by_number(&number).await,
        Err(OrderError::NotFound(_))
    ));
}

#[tokio::test]
async fn fulfillment_status_follows_the_allowed_chain() {
    let db = common::test_pool().await;
    let orders = service(db.clone());
    let order = create_license_order(&db, &orders, Some("personal")).await;

    // Skipping ahead is rejected.
    assert!(matches!(
        orders.advance_status(order.id, OrderStatus::Shipped).await,
        Err(OrderError::InvalidTransition { .. })
    ));

    let order = orders
        .advance_status(order.id, OrderStatus::Confirmed)
        .await
        .unwrap();
    let order = orders
        .advance_status(order.id, OrderStatus::Processing)
        .await
        .unwrap();
    let order = orders
        .advance_status(order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);

    // Cancelled is terminal.
    assert!(matches!(
        orders.advance_status(order.id, OrderStatus::Shipped).await,
        Err(OrderError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn orders_are_found_by_intent_id() {
    let db = common::test_pool().await;
    let orders = service(db.clone());
    let order = create_license_order(&db, &orders, Some("personal")).await;

    orders.set_payment_intent(order.id, "pi_abc123").await.unwrap();
    let found = orders.find_by_intent("pi_abc123").await.unwrap();
    assert_eq!(found.id, order.id);
}
