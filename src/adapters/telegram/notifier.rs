//! Telegram Bot API notifier.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::domain::foundation::UserId;
use crate::ports::{Notifier, NotifierError};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    http: Client,
    api_base: String,
    bot_token: SecretString,
}

impl TelegramNotifier {
    pub fn new(http: Client, api_base: impl Into<String>, bot_token: SecretString) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            bot_token,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, user_id: UserId, text: &str) -> Result<(), NotifierError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            self.bot_token.expose_secret()
        );

        let response = self
            .http
            .post(&url)
            .json(&json!({
                "chat_id": user_id.as_i64(),
                "text": text,
            }))
            .send()
            .await
            .map_err(|err| NotifierError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Rejected(format!("{}: {}", status, body)));
        }

        debug!(%user_id, "notification delivered");
        Ok(())
    }
}
