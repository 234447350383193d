//! FulfillmentClient — product catalog lookups against the print
//! fulfillment provider. The provider response is normalized into a single
//! typed DTO at this boundary; nothing downstream branches on shape.

use crate::{errors::AppError, models::order::ProductType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("fulfillment provider is not configured")]
    Unconfigured,
    #[error("fulfillment provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("product `{0}` not found")]
    ProductNotFound(String),
}

pub type FulfillmentResult<T> = Result<T, FulfillmentError>;

impl From<FulfillmentError> for AppError {
    fn from(err: FulfillmentError) -> Self {
        match err {
            FulfillmentError::Unconfigured | FulfillmentError::Http(_) => {
                AppError::upstream("print catalog unavailable, please try again")
            }
            FulfillmentError::ProductNotFound(id) => {
                AppError::validation(format!("unknown product `{id}`"))
            }
        }
    }
}

/// The provider's product, as this application sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProduct {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub currency: String,
    pub product_type: ProductType,
    /// Tier string attached to license products ("personal", "commercial",
    /// "extended"); absent on physical products.
    #[serde(default)]
    pub license_type: Option<String>,
}

#[derive(Clone)]
pub struct FulfillmentClient {
    http: reqwest::Client,
    base_url: Option<String>,
    api_key: String,
}

impl FulfillmentClient {
    pub fn new(base_url: Option<String>, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    pub async fn get_product(&self, product_id: &str) -> FulfillmentResult<ProviderProduct> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(FulfillmentError::Unconfigured)?;
        let response = self
            .http
            .get(format!("{base}/products/{product_id}"))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FulfillmentError::ProductNotFound(product_id.to_string()));
        }
        Ok(response
            .error_for_status()?
            .json::<ProviderProduct>()
            .await?)
    }
}
