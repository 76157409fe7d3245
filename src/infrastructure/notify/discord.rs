//! Discord webhook channel

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{AlertDispatcher, AlertMessage};
use crate::shared::errors::DispatchError;

/// Embed side colour (red).
const EMBED_COLOR: u32 = 0xFF0000;

pub struct DiscordWebhook {
    client: Client,
    url: String,
    username: String,
}

impl DiscordWebhook {
    pub fn new(url: &str, username: &str, timeout: Duration) -> Result<Self, DispatchError> {
        if url.trim().is_empty() {
            return Err(DispatchError::MissingWebhook);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            username: username.to_string(),
        })
    }

    fn render(&self, message: &AlertMessage, sent_at: DateTime<Utc>) -> Value {
        let fields: Vec<Value> = message
            .fields()
            .into_iter()
            .map(|(name, value)| json!({ "name": name, "value": value, "inline": true }))
            .collect();

        let mut embed = json!({
            "title": message.title(),
            "description": message.description(),
            "color": EMBED_COLOR,
            "fields": fields,
            "timestamp": sent_at.to_rfc3339(),
        });
        if let Some(url) = &message.context.url {
            embed["url"] = json!(url);
        }
        if let Some(image_url) = &message.context.image_url {
            embed["thumbnail"] = json!({ "url": image_url });
        }

        json!({
            "username": self.username,
            "embeds": [embed],
        })
    }
}

#[async_trait]
impl AlertDispatcher for DiscordWebhook {
    async fn dispatch(&self, message: &AlertMessage) -> Result<(), DispatchError> {
        let body = self.render(message, Utc::now());
        let response = self.client.post(&self.url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Rejected(status.as_u16()));
        }
        debug!(title = %message.title(), "alert delivered to Discord");
        Ok(())
    }
}
