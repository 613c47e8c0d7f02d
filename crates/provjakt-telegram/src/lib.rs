//! Telegram adapter (outbound notifications).
//!
//! This service only ever sends, so the adapter is a single `sendMessage`
//! call against the Bot HTTP API rather than a full bot framework.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use provjakt_core::{errors::Error, ports::NotifierPort, Result};

#[derive(Clone, Debug)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("http client build error: {e}")))?;
        Ok(Self {
            http,
            base_url: format!("https://api.telegram.org/{bot_token}"),
        })
    }
}

#[async_trait]
impl NotifierPort for TelegramNotifier {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
        });

        let resp = self
            .http
            .post(format!("{}/sendMessage", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("telegram request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "telegram sendMessage failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        // Response body is ignored beyond success/failure.
        Ok(())
    }
}
