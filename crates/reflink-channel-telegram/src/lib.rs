//! Telegram Bot channel for reflink.
//!
//! Uses Telegram Bot API with long-polling (no webhook required).
//!
//! # Configuration
//!
//! ```json5
//! channels: {
//!     "my-tg-bot": {
//!         channel_type: "telegram",
//!         enabled: true,
//!         settings: {
//!             bot_token: "123456:ABC-DEF...",
//!         },
//!     },
//! }
//! ```
//!
//! Setting `BOT_TOKEN` in the environment registers the same channel when
//! the config file defines none.

pub mod api;
pub mod polling;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use reflink_gateway::channel::ChannelPlugin;
use reflink_types::{ChannelConfig, ChannelStatus, InboundMessage, OutboundMessage};

use api::TelegramApi;
use types::SendMessageParams;

/// Telegram channel plugin implementing `ChannelPlugin`.
pub struct TelegramChannel {
    id: String,
    api: Arc<TelegramApi>,
    state: Mutex<TelegramState>,
}

struct TelegramState {
    status: ChannelStatus,
    cancel: Option<CancellationToken>,
    poll_handle: Option<JoinHandle<()>>,
}

impl TelegramChannel {
    /// Create a new Telegram channel with the given ID and bot token.
    pub fn new(id: String, bot_token: &str) -> anyhow::Result<Self> {
        Ok(Self::with_api(id, TelegramApi::new(bot_token)?))
    }

    /// Create a channel over an existing API client.
    pub fn with_api(id: String, api: TelegramApi) -> Self {
        Self {
            id,
            api: Arc::new(api),
            state: Mutex::new(TelegramState {
                status: ChannelStatus::Stopped,
                cancel: None,
                poll_handle: None,
            }),
        }
    }
}

/// Resolve the numeric chat id for an outbound message.
fn chat_id(message: &OutboundMessage) -> anyhow::Result<i64> {
    message
        .metadata
        .get("chat_id")
        .and_then(|v| v.as_i64())
        .or_else(|| message.conversation_id.parse::<i64>().ok())
        .context("missing chat_id in metadata and conversation_id is not a valid i64")
}

#[async_trait::async_trait]
impl ChannelPlugin for TelegramChannel {
    fn channel_type(&self) -> &str {
        "telegram"
    }

    fn channel_id(&self) -> &str {
        &self.id
    }

    async fn start(&self, sender: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.status == ChannelStatus::Running {
            bail!("Telegram channel {} is already running", self.id);
        }

        state.status = ChannelStatus::Starting;

        // Verify bot token
        match self.api.get_me().await {
            Ok(bot) => {
                info!(
                    channel_id = self.id,
                    bot_username = bot.username.as_deref().unwrap_or("unknown"),
                    "Telegram bot authenticated"
                );
            }
            Err(e) => {
                state.status = ChannelStatus::Error(format!("Auth failed: {e}"));
                bail!("Failed to authenticate Telegram bot: {e}");
            }
        }

        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();
        let channel_id = self.id.clone();
        let api = self.api.clone();

        let handle = tokio::spawn(async move {
            polling::run_polling_loop(&api, channel_id, sender, cancel_child).await;
        });

        state.cancel = Some(cancel);
        state.poll_handle = Some(handle);
        state.status = ChannelStatus::Running;

        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;

        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }

        if let Some(handle) = state.poll_handle.take() {
            let _ = handle.await;
        }

        state.status = ChannelStatus::Stopped;
        Ok(())
    }

    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        let chat_id = chat_id(&message)?;

        // Plain text only: Markdown would eat the underscores in `ref_=` query params.
        self.api
            .send_message(&SendMessageParams {
                chat_id,
                text: message.text,
            })
            .await?;

        debug!(channel_id = self.id, chat_id, "Reply sent");
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        match self.state.try_lock() {
            Ok(state) => state.status.clone(),
            Err(_) => ChannelStatus::Starting,
        }
    }
}

/// Factory function: create a `TelegramChannel` from a channel config.
///
/// Expects `config.settings["bot_token"]` to be a string.
pub fn create_telegram_channel(
    id: String,
    config: &ChannelConfig,
) -> anyhow::Result<Arc<dyn ChannelPlugin>> {
    let bot_token = config
        .settings
        .get("bot_token")
        .and_then(|v| v.as_str())
        .context("Telegram channel requires settings.bot_token (string)")?;

    let channel = TelegramChannel::new(id, bot_token)?;
    Ok(Arc::new(channel))
}
