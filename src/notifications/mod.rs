//! Outbound transactional email.
//!
//! Business operations treat delivery as best-effort: a [`MailError`] is
//! logged by the caller and never turns a completed operation into a
//! user-facing failure. The admin test-send endpoint is the one exception.

pub mod templates;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{info, instrument};

/// Mail delivery errors
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Provider rejected the message: {0}")]
    Rejected(String),
    #[error("No recipient email provided")]
    MissingRecipient,
}

/// Trait for outbound mail transports.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

/// Transactional mail transport speaking the Brevo HTTP JSON API.
pub struct BrevoMailer {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    sender_name: String,
    sender_email: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    sender: Party<'a>,
    to: Vec<Party<'a>>,
    subject: &'a str,
    #[serde(rename = "htmlContent")]
    html_content: &'a str,
}

#[derive(Serialize)]
struct Party<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    email: &'a str,
}

impl BrevoMailer {
    pub fn new(
        endpoint: String,
        api_key: String,
        sender_name: String,
        sender_email: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            sender_name,
            sender_email,
        }
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    #[instrument(skip(self, html))]
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        if to.is_empty() {
            return Err(MailError::MissingRecipient);
        }

        let body = SendEmailRequest {
            sender: Party {
                name: Some(&self.sender_name),
                email: &self.sender_email,
            },
            to: vec![Party {
                name: None,
                email: to,
            }],
            subject,
            html_content: html,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected(format!("{status}: {detail}")));
        }

        info!(%to, %subject, "email sent");
        Ok(())
    }
}

/// Transport used when no provider key is configured: logs and succeeds.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), MailError> {
        if to.is_empty() {
            return Err(MailError::MissingRecipient);
        }
        info!(%to, %subject, "mail transport disabled; dropping email");
        Ok(())
    }
}

/// Recorded outbound message, for assertions in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// In-memory transport that records every send.
#[derive(Default)]
pub struct MemoryMailer {
    pub sent: Mutex<Vec<SentEmail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_to(&self, to: &str) -> Vec<SentEmail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.to == to)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        if to.is_empty() {
            return Err(MailError::MissingRecipient);
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_mailer_records_messages() {
        let mailer = MemoryMailer::new();
        mailer
            .send("reader@example.com", "Hello", "<p>hi</p>")
            .await
            .unwrap();

        let sent = mailer.sent_to("reader@example.com");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Hello");
    }

    #[tokio::test]
    async fn test_missing_recipient_is_an_error() {
        let mailer = MemoryMailer::new();
        let result = mailer.send("", "Hello", "<p>hi</p>").await;
        assert!(matches!(result, Err(MailError::MissingRecipient)));
    }
}
