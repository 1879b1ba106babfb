//! Telegram Bot API HTTP client.

use std::time::Duration;

use anyhow::{Context, bail};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::{ApiResponse, BotInfo, GetUpdatesParams, SendMessageParams, TgMessage, Update};

const API_BASE: &str = "https://api.telegram.org";

/// HTTP client for the Telegram Bot API.
pub struct TelegramApi {
    client: Client,
    base_url: String,
}

impl TelegramApi {
    /// Create a new API client with the given bot token.
    pub fn new(bot_token: &str) -> anyhow::Result<Self> {
        Self::with_base_url(API_BASE, bot_token)
    }

    /// Create a client against a custom API host (e.g. a local Bot API server).
    pub fn with_base_url(api_base: &str, bot_token: &str) -> anyhow::Result<Self> {
        // Must outlast the 30s long-poll timeout.
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build Telegram HTTP client")?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{bot_token}", api_base.trim_end_matches('/')),
        })
    }

    /// POST `params` to `method` and unwrap the `ok`/`result` envelope.
    async fn call<P, T>(&self, method: &str, params: &P) -> anyhow::Result<Option<T>>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp: ApiResponse<T> = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(params)
            .send()
            .await
            .with_context(|| format!("{method} request failed"))?
            .json()
            .await
            .with_context(|| format!("{method} response parse failed"))?;

        if !resp.ok {
            bail!(
                "{method} failed: {}",
                resp.description.unwrap_or_else(|| "unknown error".into())
            );
        }
        Ok(resp.result)
    }

    /// Verify the bot token by calling `getMe`.
    pub async fn get_me(&self) -> anyhow::Result<BotInfo> {
        self.call("getMe", &serde_json::json!({}))
            .await?
            .context("getMe returned no result")
    }

    /// Long-poll for updates.
    pub async fn get_updates(&self, params: &GetUpdatesParams) -> anyhow::Result<Vec<Update>> {
        Ok(self.call("getUpdates", params).await?.unwrap_or_default())
    }

    /// Send a plain-text message.
    pub async fn send_message(&self, params: &SendMessageParams) -> anyhow::Result<TgMessage> {
        self.call("sendMessage", params)
            .await?
            .context("sendMessage returned no result")
    }
}
