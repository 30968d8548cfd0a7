// In crates/notifier/src/telegram.rs

use crate::{Error, Notifier, Result};
use app_config::types::TelegramSettings;
use async_trait::async_trait;
use core_types::SessionId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sends messages through the Telegram Bot API. The session id is the chat id.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http_client: reqwest::Client,
    /// `{api_base_url}/bot{token}`; every method is appended to it.
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(settings: &TelegramSettings, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ClientBuildError(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: format!(
                "{}/bot{}",
                settings.api_base_url.trim_end_matches('/'),
                settings.bot_token
            ),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "TelegramNotifier"
    }

    async fn send(&self, session: SessionId, text: &str) -> Result<()> {
        let body = SendMessage { chat_id: session.0, text, parse_mode: "HTML" };
        tracing::debug!(session = %session, "Delivering Telegram message.");

        let response: ApiResponse = self
            .http_client
            .post(format!("{}/sendMessage", self.endpoint))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(Error::Rejected(
                response.description.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(())
    }
}
