use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{redact_endpoint, Sink};
use crate::error::DeliveryError;
use crate::message::Message;

/// Discord-style webhook: one rich embed per message, posted as the author.
#[derive(Clone)]
pub struct DiscordWebhook {
    webhook: String,
    client: Client,
    timeout: Option<Duration>,
}

impl DiscordWebhook {
    pub fn new(webhook: String, client: Client) -> Self {
        Self {
            webhook,
            client,
            timeout: None,
        }
    }

    /// Per-request timeout on top of whatever the client already enforces.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(secs));
        self
    }
}

#[async_trait::async_trait]
impl Sink for DiscordWebhook {
    async fn deliver(&self, message: &Message) -> Result<(), DeliveryError> {
        let payload = WebhookPayload::from_message(message);

        let mut req = self.client.post(&self.webhook).json(&payload);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let rsp = req.send().await?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                endpoint: self.label(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    fn label(&self) -> String {
        redact_endpoint(&self.webhook)
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Embed {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    pub color: u32,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl WebhookPayload {
    pub fn from_message(m: &Message) -> Self {
        Self {
            embeds: vec![Embed {
                description: m.text.clone(),
                image: m.photo.clone().map(|url| EmbedImage { url }),
                color: m.color,
                timestamp: iso_utc(m.timestamp),
            }],
            username: m.author.clone(),
            avatar_url: m.profile_picture.clone(),
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ` for a unix timestamp.
pub fn iso_utc(unix_secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(unix_secs, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
}
