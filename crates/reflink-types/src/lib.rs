use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ──────────────────── Channel Types ────────────────────

/// Text message from an external chat channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel type (e.g. "telegram").
    pub channel_type: String,
    /// Unique channel instance ID.
    pub channel_id: String,
    /// Opaque conversation identifier replies are addressed to.
    pub conversation_id: String,
    /// External user/sender identifier.
    pub sender_id: String,
    /// Display name of the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Message text content.
    pub text: String,
    /// Bot command name without the leading slash (e.g. "start").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Platform-specific metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Message timestamp (unix millis).
    pub timestamp: i64,
}

/// Reply text going back out through a chat channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Channel type (e.g. "telegram").
    pub channel_type: String,
    /// Unique channel instance ID.
    pub channel_id: String,
    /// Conversation the reply belongs to.
    pub conversation_id: String,
    /// Reply text content.
    pub text: String,
    /// Platform-specific metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl OutboundMessage {
    /// Build a reply addressed to the conversation `inbound` came from.
    pub fn reply_to(inbound: &InboundMessage, text: impl Into<String>) -> Self {
        Self {
            channel_type: inbound.channel_type.clone(),
            channel_id: inbound.channel_id.clone(),
            conversation_id: inbound.conversation_id.clone(),
            text: text.into(),
            metadata: inbound.metadata.clone(),
        }
    }
}

/// Status of a channel plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Channel is not running.
    Stopped,
    /// Channel is initializing.
    Starting,
    /// Channel is running and accepting messages.
    Running,
    /// Channel encountered an error.
    Error(String),
}

/// Summary information about a registered channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel type (e.g. "telegram").
    pub channel_type: String,
    /// Unique channel instance ID.
    pub channel_id: String,
    /// Current status.
    pub status: ChannelStatus,
}

/// Configuration for a channel instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel type (e.g. "telegram").
    pub channel_type: String,
    /// Whether this channel is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Channel-specific settings (e.g. bot token).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub settings: HashMap<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}
