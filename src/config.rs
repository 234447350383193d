use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub media_dir: String,

    /// Absolute base URL used in feeds, sitemaps and emails.
    pub public_base_url: String,
    pub site_title: String,

    /// Bearer token protecting the admin routes. When unset, every admin
    /// request is rejected.
    pub admin_token: Option<String>,

    /// Address that receives selection submissions, inquiries and
    /// photographer notifications.
    pub contact_email: String,

    pub payment_api_url: Option<String>,
    pub payment_secret_key: String,
    pub payment_webhook_secret: String,

    pub fulfillment_api_url: Option<String>,
    pub fulfillment_api_key: String,

    pub mail_api_url: Option<String>,
    pub mail_api_token: String,
    pub mail_from: String,

    /// ISO currency code used for orders.
    pub currency: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Photography portfolio & print storefront API")]
pub struct Args {
    /// Host to bind to (overrides GALLERY_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GALLERY_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides GALLERY_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory where media files are stored (overrides GALLERY_STORE_MEDIA_DIR)
    #[arg(long)]
    pub media_dir: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        let env_host = env_or("GALLERY_STORE_HOST", "0.0.0.0");
        let env_port = match env::var("GALLERY_STORE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing GALLERY_STORE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading GALLERY_STORE_PORT"),
        };
        let env_db = env_or(
            "GALLERY_STORE_DATABASE_URL",
            "sqlite://./data/gallery_store.db",
        );
        let env_media = env_or("GALLERY_STORE_MEDIA_DIR", "./data/media");

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            media_dir: args.media_dir.unwrap_or(env_media),
            public_base_url: env_or("GALLERY_STORE_PUBLIC_BASE_URL", "http://localhost:3000"),
            site_title: env_or("GALLERY_STORE_SITE_TITLE", "Photography Portfolio"),
            admin_token: env_opt("GALLERY_STORE_ADMIN_TOKEN"),
            contact_email: env_or("GALLERY_STORE_CONTACT_EMAIL", "studio@example.com"),
            payment_api_url: env_opt("GALLERY_STORE_PAYMENT_API_URL"),
            payment_secret_key: env_or("GALLERY_STORE_PAYMENT_SECRET_KEY", ""),
            payment_webhook_secret: env_or("GALLERY_STORE_PAYMENT_WEBHOOK_SECRET", ""),
            fulfillment_api_url: env_opt("GALLERY_STORE_FULFILLMENT_API_URL"),
            fulfillment_api_key: env_or("GALLERY_STORE_FULFILLMENT_API_KEY", ""),
            mail_api_url: env_opt("GALLERY_STORE_MAIL_API_URL"),
            mail_api_token: env_or("GALLERY_STORE_MAIL_API_TOKEN", ""),
            mail_from: env_or("GALLERY_STORE_MAIL_FROM", "no-reply@example.com"),
            currency: env_or("GALLERY_STORE_CURRENCY", "usd"),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
