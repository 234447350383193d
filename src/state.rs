//! Shared application state handed to every handler.

use crate::{
    config::AppConfig,
    services::{
        activity_service::ActivityService, blog_service::BlogService,
        catalog_service::CatalogService, fulfillment_service::FulfillmentClient,
        gallery_service::GalleryService, inquiry_service::InquiryService,
        mailer_service::MailerService, media_store::MediaStore, order_service::OrderService,
        payment_service::PaymentClient, rate_limit_service::RateLimitService,
        selection_service::SelectionService, settings_service::SettingsService,
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub cfg: AppConfig,
    pub catalog: CatalogService,
    pub galleries: GalleryService,
    pub selections: SelectionService,
    pub orders: OrderService,
    pub blog: BlogService,
    pub inquiries: InquiryService,
    pub settings: SettingsService,
    pub limiter: RateLimitService,
    pub activity: ActivityService,
    pub payments: PaymentClient,
    pub fulfillment: FulfillmentClient,
    pub mailer: MailerService,
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, cfg: AppConfig) -> Self {
        let media = MediaStore::new(cfg.media_dir.clone());
        let settings = SettingsService::new(db.clone());
        Self {
            catalog: CatalogService::new(db.clone(), media),
            galleries: GalleryService::new(db.clone()),
            selections: SelectionService::new(db.clone()),
            orders: OrderService::new(db.clone(), settings.clone()),
            blog: BlogService::new(db.clone()),
            inquiries: InquiryService::new(db.clone()),
            settings,
            limiter: RateLimitService::new(),
            activity: ActivityService::new(db.clone()),
            payments: PaymentClient::new(
                cfg.payment_api_url.clone(),
                cfg.payment_secret_key.clone(),
                cfg.payment_webhook_secret.clone(),
            ),
            fulfillment: FulfillmentClient::new(
                cfg.fulfillment_api_url.clone(),
                cfg.fulfillment_api_key.clone(),
            ),
            mailer: MailerService::new(
                cfg.mail_api_url.clone(),
                cfg.mail_api_token.clone(),
                cfg.mail_from.clone(),
            ),
            db,
            cfg,
        }
    }
}
