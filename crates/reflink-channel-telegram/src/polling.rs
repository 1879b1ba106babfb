//! Telegram long-polling loop.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use reflink_types::InboundMessage;

use crate::api::TelegramApi;
use crate::types::{GetUpdatesParams, TgMessage};

/// Convert a Telegram message into an `InboundMessage`. Non-text messages are skipped.
pub fn to_inbound(channel_id: &str, msg: TgMessage) -> Option<InboundMessage> {
    let command = msg.command().map(str::to_string);
    let text = msg.text?;

    let sender_id = msg
        .from
        .as_ref()
        .map(|u| u.id.to_string())
        .unwrap_or_else(|| msg.chat.id.to_string());
    let sender_name = msg.from.as_ref().map(|u| u.display_name());

    let mut metadata = HashMap::new();
    metadata.insert(
        "chat_id".into(),
        serde_json::Value::Number(msg.chat.id.into()),
    );
    metadata.insert(
        "message_id".into(),
        serde_json::Value::Number(msg.message_id.into()),
    );

    Some(InboundMessage {
        channel_type: "telegram".into(),
        channel_id: channel_id.to_string(),
        conversation_id: msg.chat.id.to_string(),
        sender_id,
        sender_name,
        text,
        command,
        metadata,
        timestamp: msg.date * 1000,
    })
}

/// Run the long-polling loop, forwarding text messages to `sender`.
///
/// Exits when `cancel` is cancelled or the `sender` is closed.
pub async fn run_polling_loop(
    api: &TelegramApi,
    channel_id: String,
    sender: mpsc::Sender<InboundMessage>,
    cancel: CancellationToken,
) {
    let mut offset: Option<i64> = None;
    let mut backoff = Duration::from_secs(1);
    let max_backoff = Duration::from_secs(30);

    info!(channel_id, "Telegram polling loop started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let params = GetUpdatesParams {
            offset,
            timeout: Some(30),
            allowed_updates: Some(vec!["message".into()]),
        };

        let updates = tokio::select! {
            _ = cancel.cancelled() => break,
            result = api.get_updates(&params) => result,
        };

        match updates {
            Ok(updates) => {
                backoff = Duration::from_secs(1);

                for update in updates {
                    offset = Some(update.update_id + 1);

                    let Some(inbound) = update.message.and_then(|m| to_inbound(&channel_id, m))
                    else {
                        continue;
                    };

                    debug!(
                        channel_id,
                        update_id = update.update_id,
                        "Forwarding Telegram message"
                    );

                    if sender.send(inbound).await.is_err() {
                        info!(channel_id, "Inbound channel closed, stopping polling");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(
                    channel_id,
                    backoff_secs = backoff.as_secs(),
                    "getUpdates error: {e}"
                );

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {},
                }

                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }

    info!(channel_id, "Telegram polling loop stopped");
}
