//! Outbound text messaging.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("messaging is not configured")]
    NotConfigured,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Sends a text message from a business number to a caller.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Returns the provider's delivery id.
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<String, MessagingError>;
}

/// Sender used when no messaging credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSender;

#[async_trait]
impl MessageSender for DisabledSender {
    async fn send(&self, _from: &str, _to: &str, _body: &str) -> Result<String, MessagingError> {
        Err(MessagingError::NotConfigured)
    }
}

/// Twilio Programmable Messaging over its REST API.
#[derive(Clone)]
pub struct TwilioSender {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    api_base: String,
}

impl fmt::Debug for TwilioSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioSender")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TwilioSender {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            api_base: TWILIO_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Deserialize)]
struct ErrorResource {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl MessageSender for TwilioSender {
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<String, MessagingError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("From", from), ("To", to), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResource>()
                .await
                .map(|e| e.message)
                .unwrap_or_default();
            return Err(MessagingError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let resource: MessageResource = response.json().await?;
        tracing::debug!(message_sid = %resource.sid, "text message accepted");
        Ok(resource.sid)
    }
}
