//! Telegram bot chat channel

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::config::Notification;
use super::notifier::{markdown_bold, markdown_links, NotifierError, NotifyChannel};
use crate::config::TelegramConfig;

/// Posts notifications to one chat through the Bot API
pub struct TelegramChannel {
    client: reqwest::Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramChannel {
    pub fn new(
        config: &TelegramConfig,
        api_url: &str,
        timeout: Duration,
    ) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Chat text: bold subject line followed by the body with Markdown links
    pub fn format_text(notification: &Notification) -> String {
        format!(
            "{}\n{}",
            markdown_bold(&notification.subject),
            markdown_links(&notification.body)
        )
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, notification: &Notification) -> Result<(), NotifierError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": Self::format_text(notification),
            "parse_mode": "Markdown",
        });

        // reqwest errors carry the URL, which embeds the bot token
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifierError::Telegram(e.without_url().to_string()))?;

        let status = response.status();
        let body: Option<BotResponse> = response.json().await.ok();

        match body {
            Some(BotResponse { ok: true, .. }) if status.is_success() => {
                tracing::debug!(chat_id = %self.chat_id, "Telegram message accepted");
                Ok(())
            }
            Some(BotResponse { description, .. }) => Err(NotifierError::Telegram(format!(
                "Bot API returned status {}: {}",
                status,
                description.unwrap_or_else(|| "no description".to_string())
            ))),
            None => Err(NotifierError::Telegram(format!(
                "Bot API returned status {} with an unreadable body",
                status
            ))),
        }
    }
}
