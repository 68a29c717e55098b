//! Operator notifications.
//!
//! Defines the `Notifier` trait and provides a Telegram Bot API sender
//! plus a log-only fallback for runs without Telegram credentials.
//! Delivery is best-effort: failures are logged here and never reach
//! the caller.

pub mod messages;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::types::ArbError;

#[cfg(test)]
use mockall::automock;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Fire-and-forget text delivery to a human.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` (Telegram HTML subset). Must not fail the caller.
    async fn send(&self, text: &str);
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

/// Sends messages through `sendMessage` with `parse_mode=HTML`.
pub struct TelegramNotifier {
    http: Client,
    base_url: String,
    token: SecretString,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: SecretString, chat_id: String, timeout: Duration) -> Result<Self> {
        Self::with_base_url(TELEGRAM_API, token, chat_id, timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        token: SecretString,
        chat_id: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for Telegram")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            chat_id,
        })
    }

    async fn try_send(&self, text: &str) -> Result<(), ArbError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.base_url,
            self.token.expose_secret()
        );
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
        });

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ArbError::Notification(format!("Telegram request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ArbError::Notification(format!(
                "Telegram API error {status}: {body}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) {
        match self.try_send(text).await {
            Ok(()) => debug!(chars = text.len(), "Telegram message sent"),
            // reqwest errors embed the URL, which carries the bot token.
            Err(e) => warn!(
                error = %e.to_string().replace(self.token.expose_secret(), "<redacted>"),
                "Failed to send Telegram message"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Log-only fallback
// ---------------------------------------------------------------------------

/// Writes notifications to the log instead of a messaging channel.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) {
        info!(message = %text, "Notification");
    }
}
