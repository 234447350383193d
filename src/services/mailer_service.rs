//! MailerService — plain-text notifications through a transactional-mail
//! HTTP API. Reply-to points at the submitting visitor so the photographer
//! can answer directly.

use crate::errors::AppError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail delivery is not configured")]
    Unconfigured,
    #[error("mail API request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type MailResult<T> = Result<T, MailError>;

impl From<MailError> for AppError {
    fn from(_: MailError) -> Self {
        AppError::upstream("could not send email, please try again")
    }
}

#[derive(Debug, Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    subject: &'a str,
    text: &'a str,
}

#[derive(Clone)]
pub struct MailerService {
    http: reqwest::Client,
    api_url: Option<String>,
    api_token: String,
    from: String,
}

impl MailerService {
    pub fn new(api_url: Option<String>, api_token: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_token,
            from,
        }
    }

    pub async fn send_plain(
        &self,
        to: &str,
        subject: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> MailResult<()> {
        let url = self.api_url.as_deref().ok_or(MailError::Unconfigured)?;
        self.http
            .post(url)
            .bearer_auth(&self.api_token)
            .json(&OutgoingMail {
                from: &self.from,
                to,
                reply_to,
                subject,
                text,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
