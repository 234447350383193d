//! Handlers for checkout: quoting, order creation with payment-intent
//! rollback, webhook confirmation, manual re-check and licensed download.

use crate::{
    errors::AppError,
    handlers::photo_handlers::stream_file,
    models::order::{Order, OrderStatus, PaymentStatus},
    services::{
        media_store::MediaKind,
        order_service::{NewOrderRequest, build_quote},
        payment_service::IntentStatus,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub product_id: String,
}

/// GET `/api/checkout/quote?product_id=…` — price a product. Pure lookup
/// plus arithmetic; nothing is persisted.
pub async fn quote(
    State(state): State<AppState>,
    Query(q): Query<QuoteQuery>,
) -> Result<Json<crate::services::order_service::Quote>, AppError> {
    let product = state.fulfillment.get_product(&q.product_id).await?;
    let rules = state.orders.pricing_rules().await?;
    Ok(Json(build_quote(&product, &rules)))
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_number: String,
    pub total_cents: i64,
    pub currency: String,
    pub client_secret: Option<String>,
}

/// POST `/api/checkout` — create the order and its payment intent.
///
/// If intent creation fails the order row is deleted before responding;
/// no partial state survives.
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<NewOrderRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    // The photo must exist and be published before money changes hands.
    let photo = state.catalog.get_photo(req.photo_id).await?;
    if !photo.is_published {
        return Err(AppError::not_found("photo not found"));
    }

    let product = state.fulfillment.get_product(&req.product_id).await?;
    let rules = state.orders.pricing_rules().await?;
    let quote = build_quote(&product, &rules);

    let order = state.orders.create_order(&req, &product, &quote).await?;

    let intent = match state
        .payments
        .create_intent(order.total_cents, &order.currency, &order.order_number)
        .await
    {
        Ok(intent) => intent,
        Err(err) => {
            state.orders.delete_order(order.id).await?;
            tracing::warn!(
                "payment intent creation failed for {}: {}",
                order.order_number,
                err
            );
            return Err(err.into());
        }
    };
    state.orders.set_payment_intent(order.id, &intent.id).await?;
    state
        .activity
        .record(
            "order_created",
            Some(format!("{} ({})", order.order_number, order.product_name)),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_number: order.order_number,
            total_cents: order.total_cents,
            currency: order.currency,
            client_secret: intent.client_secret,
        }),
    ))
}

/// POST `/api/checkout/webhook` — provider-signed payment events.
///
/// The signature is verified over the raw body before anything is parsed.
/// Only `payment_intent.succeeded` moves an order to paid; everything else
/// is acknowledged and ignored.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>, AppError> {
    let signature = headers
        .get("x-payment-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("missing webhook signature"))?;
    let event = state.payments.verify_webhook(signature, &body)?;

    if event.kind == "payment_intent.succeeded" {
        let order = match event.data.order_number.as_deref() {
            Some(number) => state.orders.find_by_number(number).await?,
            None => state.orders.find_by_intent(&event.data.intent_id).await?,
        };
        let was_pending = order.payment_status == PaymentStatus::Pending;
        let order = state.orders.confirm_paid(order.id).await?;
        if was_pending && order.payment_status == PaymentStatus::Paid {
            state
                .activity
                .record("order_paid", Some(order.order_number.clone()))
                .await;
            let note = format!(
                "Order {} is paid.\n\nProduct: {}\nCustomer: {} <{}>\nTotal: {} {}\n",
                order.order_number,
                order.product_name,
                order.customer_name,
                order.customer_email,
                order.total_cents,
                order.currency
            );
            if let Err(err) = state
                .mailer
                .send_plain(
                    &state.cfg.contact_email,
                    &format!("Order paid: {}", order.order_number),
                    &note,
                    None,
                )
                .await
            {
                tracing::warn!("order notification email failed: {}", err);
                state
                    .activity
                    .record("email_failed", Some(format!("order {}", order.order_number)))
                    .await;
            }
        }
    }

    Ok(Json(json!({ "received": true })))
}

/// GET `/api/checkout/confirm/{order_number}` — re-poll the provider and
/// apply the paid transition if the intent succeeded. Idempotent.
pub async fn confirm(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<Order>, AppError> {
    let order = state.orders.find_by_number(&order_number).await?;
    let intent_id = order
        .payment_intent_id
        .clone()
        .ok_or_else(|| AppError::validation("order has no payment intent"))?;
    let intent = state.payments.retrieve_intent(&intent_id).await?;

    let order = if intent.status == IntentStatus::Succeeded {
        let was_pending = order.payment_status == PaymentStatus::Pending;
        let confirmed = state.orders.confirm_paid(order.id).await?;
        if was_pending {
            state
                .activity
                .record("order_paid", Some(confirmed.order_number.clone()))
                .await;
        }
        confirmed
    } else {
        order
    };
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub key: String,
}

/// GET `/api/checkout/download/{order_number}?key=…` — licensed download.
///
/// Checks run in a fixed order, each with its own 403 reason; success
/// consumes one download and streams the original file.
pub async fn licensed_download(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Query(q): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let order = state.orders.find_by_number(&order_number).await?;
    state.orders.authorize_download(&order, &q.key)?;
    state.orders.consume_download(order.id).await?;

    let photo = state.catalog.get_photo(order.photo_id).await?;
    let (file, len, content_type) = state.catalog.open_media(&photo, MediaKind::Original).await?;
    Ok(stream_file(file, len, &content_type))
}

// --- Admin surface ---

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub limit: Option<i64>,
}

/// GET `/api/admin/orders`
pub async fn admin_list_orders(
    State(state): State<AppState>,
    Query(q): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.orders.list(q.limit.unwrap_or(100)).await?))
}

#[derive(Debug, Deserialize)]
pub struct AdvanceStatusRequest {
    pub status: OrderStatus,
}

/// PATCH `/api/admin/orders/{id}/status`
pub async fn advance_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AdvanceStatusRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.orders.advance_status(id, req.status).await?))
}

/// POST `/api/admin/orders/{id}/refund` — mark refunded. The actual refund
/// happens in the provider dashboard; this records it locally.
pub async fn refund_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.orders.mark_refunded(id).await?;
    state
        .activity
        .record("order_refunded", Some(order.order_number.clone()))
        .await;
    Ok(Json(order))
}
