//! Channel plugin framework for chat platform integrations.
//!
//! ```text
//! Chat platform
//!     ↓ (platform-specific protocol)
//! ChannelPlugin::start() spawns listener
//!     ↓ (InboundMessage via mpsc)
//! ChannelManager → LinkProcessor::handle()
//!     ↓ (reply texts)
//! ChannelPlugin::send(OutboundMessage)
//!     ↓ (platform-specific protocol)
//! Chat platform
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use reflink_core::LinkProcessor;
use reflink_types::{ChannelInfo, ChannelStatus, InboundMessage, OutboundMessage};

/// Trait for channel plugins that bridge chat platforms to the link processor.
///
/// Use `&self` for all methods; implementations should use interior mutability
/// (e.g. `Mutex`, `RwLock`) for any mutable state.
#[async_trait::async_trait]
pub trait ChannelPlugin: Send + Sync {
    /// Returns the channel type identifier (e.g. "telegram").
    fn channel_type(&self) -> &str;

    /// Returns the unique instance identifier for this channel.
    fn channel_id(&self) -> &str;

    /// Start the channel. Incoming text messages are pushed into `sender`.
    async fn start(&self, sender: mpsc::Sender<InboundMessage>) -> anyhow::Result<()>;

    /// Stop the channel, disconnecting from the platform.
    async fn stop(&self) -> anyhow::Result<()>;

    /// Send a reply to the platform.
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()>;

    /// Returns the current status of this channel.
    fn status(&self) -> ChannelStatus;
}

/// Greeting sent in answer to `/start`.
pub fn greeting(sender_name: Option<&str>) -> String {
    let name = sender_name.unwrap_or("there");
    format!(
        "👋🏼 Hello {name} 👋🏼\nSend me your amazon links\n🙏🏼 thanks for the support 🙏🏼"
    )
}

/// Manages channel plugins and routes their messages through the link processor.
pub struct ChannelManager {
    channels: RwLock<HashMap<String, Arc<dyn ChannelPlugin>>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
}

impl ChannelManager {
    /// Create a new channel manager with the given buffer capacity.
    pub fn new(buffer_size: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer_size);
        Self {
            channels: RwLock::new(HashMap::new()),
            inbound_tx: tx,
            inbound_rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Register a channel plugin. Replaces any existing channel with the same ID.
    pub async fn register(&self, channel: Arc<dyn ChannelPlugin>) {
        let id = channel.channel_id().to_string();
        info!(
            channel_type = channel.channel_type(),
            channel_id = %id,
            "Registering channel plugin"
        );
        self.channels.write().await.insert(id, channel);
    }

    /// Start all registered channels. Returns how many started.
    pub async fn start_all(&self) -> usize {
        let channels = self.channels.read().await;
        let mut started = 0;
        for (id, channel) in channels.iter() {
            match channel.start(self.inbound_tx.clone()).await {
                Ok(()) => started += 1,
                Err(e) => warn!(channel_id = %id, "Failed to start channel: {e}"),
            }
        }
        started
    }

    /// Stop all registered channels.
    pub async fn stop_all(&self) {
        let channels = self.channels.read().await;
        for (id, channel) in channels.iter() {
            if let Err(e) = channel.stop().await {
                warn!(channel_id = %id, "Failed to stop channel: {e}");
            }
        }
    }

    /// Send a message through the appropriate channel.
    pub async fn send_message(&self, message: OutboundMessage) -> anyhow::Result<()> {
        let channels = self.channels.read().await;
        let channel = channels
            .get(&message.channel_id)
            .ok_or_else(|| anyhow::anyhow!("Channel not found: {}", message.channel_id))?;

        channel.send(message).await
    }

    /// List all registered channels with their status.
    pub async fn list_channels(&self) -> Vec<ChannelInfo> {
        let channels = self.channels.read().await;
        channels
            .values()
            .map(|ch| ChannelInfo {
                channel_type: ch.channel_type().to_string(),
                channel_id: ch.channel_id().to_string(),
                status: ch.status(),
            })
            .collect()
    }

    /// Handle one inbound message and send its replies. Returns the number of
    /// replies delivered.
    ///
    /// A failed send is logged and does not stop the remaining replies.
    pub async fn handle_inbound(&self, processor: &LinkProcessor, inbound: InboundMessage) -> usize {
        info!(
            channel_type = %inbound.channel_type,
            channel_id = %inbound.channel_id,
            conversation = %inbound.conversation_id,
            sender = inbound.sender_name.as_deref().unwrap_or(&inbound.sender_id),
            "Message received"
        );

        let replies = match inbound.command.as_deref() {
            Some("start") => vec![greeting(inbound.sender_name.as_deref())],
            _ => processor.handle(&inbound.text, &inbound.conversation_id).await,
        };

        let mut delivered = 0;
        for text in replies {
            let outbound = OutboundMessage::reply_to(&inbound, text);
            match self.send_message(outbound).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    conversation = %inbound.conversation_id,
                    "Failed to send reply: {e}"
                ),
            }
        }
        debug!(conversation = %inbound.conversation_id, delivered, "Replies sent");
        delivered
    }

    /// Run the inbound message processing loop.
    ///
    /// Each message is handled in its own task. Should be spawned as a
    /// background task and aborted on shutdown; the manager keeps its own
    /// sender, so the inbound channel never closes while it is alive.
    pub async fn run_message_loop(self: &Arc<Self>, processor: Arc<LinkProcessor>) {
        let mut rx = self.inbound_rx.lock().await;

        info!("Channel message loop started");

        while let Some(inbound) = rx.recv().await {
            let processor = processor.clone();
            let channel_mgr = self.clone();

            tokio::spawn(async move {
                channel_mgr.handle_inbound(&processor, inbound).await;
            });
        }

        info!("Channel message loop stopped");
    }
}
