//! Transactional email delivery.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Notification telling a student how their work was reviewed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEmail {
    pub to_name: String,
    pub to_email: String,
    pub approved: bool,
    pub link: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_status(&self, email: &StatusEmail) -> Result<(), MailError>;
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
    dynamic_template_data: serde_json::Value,
}

#[derive(Serialize)]
struct TemplateMessage<'a> {
    from: Address<'a>,
    template_id: &'a str,
    personalizations: Vec<Personalization<'a>>,
}

/// Dynamic-template mailer for the SendGrid v3 API.
pub struct SendGridMailer {
    http: reqwest::Client,
    config: EmailConfig,
}

impl SendGridMailer {
    pub fn new(http: reqwest::Client, config: EmailConfig) -> Self {
        Self { http, config }
    }

    fn message<'a>(&'a self, email: &'a StatusEmail) -> TemplateMessage<'a> {
        let template_id = if email.approved {
            &self.config.approved_template
        } else {
            &self.config.rejected_template
        };

        TemplateMessage {
            from: Address {
                email: &self.config.sender_address,
                name: &self.config.sender_name,
            },
            template_id,
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &email.to_email,
                    name: &email.to_name,
                }],
                dynamic_template_data: json!({
                    "link": email.link,
                    "first_name": email.to_name,
                }),
            }],
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send_status(&self, email: &StatusEmail) -> Result<(), MailError> {
        let url = format!("{}/v3/mail/send", self.config.api_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&self.message(email))
            .send()
            .await?;

        let status = response.status();
        debug!(status = status.as_u16(), "email provider response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
