//! PaymentClient — thin HTTP client for the payment provider plus webhook
//! signature verification.
//!
//! The provider exposes a payment-intent API: create an intent for an
//! amount, poll it by id, and receive webhook events signed with a shared
//! secret over `"{timestamp}.{raw_body}"`.

use crate::errors::AppError;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider is not configured")]
    Unconfigured,
    #[error("payment provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid webhook signature")]
    BadSignature,
    #[error("malformed webhook payload: {0}")]
    BadPayload(String),
}

pub type PaymentResult<T> = Result<T, PaymentError>;

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Unconfigured | PaymentError::Http(_) => {
                AppError::upstream("payment provider unavailable, please try again")
            }
            PaymentError::BadSignature => AppError::unauthorized("invalid webhook signature"),
            PaymentError::BadPayload(msg) => AppError::validation(msg),
        }
    }
}

/// Provider-side intent status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    Processing,
    Succeeded,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: IntentStatus,
}

#[derive(Debug, Serialize)]
struct CreateIntentBody<'a> {
    amount: i64,
    currency: &'a str,
    metadata: IntentMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct IntentMetadata<'a> {
    order_number: &'a str,
}

/// A verified webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub intent_id: String,
    pub order_number: Option<String>,
}

#[derive(Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    base_url: Option<String>,
    secret_key: String,
    webhook_secret: String,
}

impl PaymentClient {
    pub fn new(base_url: Option<String>, secret_key: String, webhook_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            secret_key,
            webhook_secret,
        }
    }

    fn base(&self) -> PaymentResult<&str> {
        self.base_url.as_deref().ok_or(PaymentError::Unconfigured)
    }

    /// Create a payment intent for an order. Returns the client secret the
    /// browser needs to complete the charge.
    pub async fn create_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        order_number: &str,
    ) -> PaymentResult<PaymentIntent> {
        let base = self.base()?;
        let intent = self
            .http
            .post(format!("{base}/v1/payment_intents"))
            .bearer_auth(&self.secret_key)
            .json(&CreateIntentBody {
                amount: amount_cents,
                currency,
                metadata: IntentMetadata { order_number },
            })
            .send()
            .await?
            .error_for_status()?
            .json::<PaymentIntent>()
            .await?;
        Ok(intent)
    }

    /// Fetch the current status of an intent.
    pub async fn retrieve_intent(&self, intent_id: &str) -> PaymentResult<PaymentIntent> {
        let base = self.base()?;
        let intent = self
            .http
            .get(format!("{base}/v1/payment_intents/{intent_id}"))
            .bearer_auth(&self.secret_key)
            .send()
            .await?
            .error_for_status()?
            .json::<PaymentIntent>()
            .await?;
        Ok(intent)
    }

    /// Verify the `t=...,v1=...` signature header over the raw body and
    /// parse the event. The MAC covers `"{t}.{body}"`.
    pub fn verify_webhook(&self, signature_header: &str, body: &str) -> PaymentResult<WebhookEvent> {
        let mut timestamp = None;
        let mut signature = None;
        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signature = Some(value),
                _ => {}
            }
        }
        let (timestamp, signature) = match (timestamp, signature) {
            (Some(t), Some(s)) => (t, s),
            _ => return Err(PaymentError::BadSignature),
        };

        let expected = sign_payload(&self.webhook_secret, timestamp, body);
        if !expected.eq_ignore_ascii_case(signature) {
            return Err(PaymentError::BadSignature);
        }

        serde_json::from_str::<WebhookEvent>(body)
            .map_err(|e| PaymentError::BadPayload(e.to_string()))
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{body}"` under `secret`.
pub fn sign_payload(secret: &str, timestamp: &str, body: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(format!("{timestamp}.{body}").as_bytes());
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(secret: &str) -> PaymentClient {
        PaymentClient::new(None, "sk_test".into(), secret.into())
    }

    #[test]
    fn accepts_a_correctly_signed_payload() {
        let body = r#"{"type":"payment_intent.succeeded","data":{"intent_id":"pi_1","order_number":"GS-20260805-AB12CD"}}"#;
        let header = format!("t=1754300000,v1={}", sign_payload("whsec", "1754300000", body));
        let event = client("whsec").verify_webhook(&header, body).unwrap();
        assert_eq!(event.kind, "payment_intent.succeeded");
        assert_eq!(event.data.intent_id, "pi_1");
    }

    #[test]
    fn rejects_a_tampered_body() {
        let body = r#"{"type":"payment_intent.succeeded","data":{"intent_id":"pi_1"}}"#;
        let header = format!("t=1754300000,v1={}", sign_payload("whsec", "1754300000", body));
        let tampered = body.replace("pi_1", "pi_2");
        assert!(matches!(
            client("whsec").verify_webhook(&header, &tampered),
            Err(PaymentError::BadSignature)
        ));
    }

    #[test]
    fn rejects_a_wrong_secret() {
        let body = r#"{"type":"payment_intent.succeeded","data":{"intent_id":"pi_1"}}"#;
        let header = format!("t=1,v1={}", sign_payload("other-secret", "1", body));
        assert!(matches!(
            client("whsec").verify_webhook(&header, body),
            Err(PaymentError::BadSignature)
        ));
    }

    #[test]
    fn rejects_a_malformed_header() {
        assert!(matches!(
            client("whsec").verify_webhook("v1=deadbeef", "{}"),
            Err(PaymentError::BadSignature)
        ));
    }

    #[test]
    fn unknown_intent_statuses_deserialize() {
        let intent: PaymentIntent =
            serde_json::from_str(r#"{"id":"pi_9","client_secret":null,"status":"requires_capture"}"#)
                .unwrap();
        assert_eq!(intent.status, IntentStatus::Unknown);
    }
}
