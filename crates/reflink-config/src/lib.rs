use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use reflink_types::ChannelConfig;

/// Environment variable holding the referral tag.
pub const ENV_AFFILIATE_TAG: &str = "AFFILIATE_TAG";
/// Environment variable holding the Telegram bot token.
pub const ENV_BOT_TOKEN: &str = "BOT_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
}

/// Referral tag settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferralConfig {
    /// Tag value appended as `tag=<value>`. Empty or missing disables rewriting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ReferralConfig {
    /// The configured tag, treating an empty string as absent.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().filter(|t| !t.is_empty())
    }
}

/// Redirect chase limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum number of redirect hops to follow.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    /// Per-hop connect and response timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_hops() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Top-level reflink configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReflinkConfig {
    #[serde(default)]
    pub referral: ReferralConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Named channel configurations.
    #[serde(default)]
    pub channels: HashMap<String, ChannelConfig>,
}

impl ReflinkConfig {
    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// `AFFILIATE_TAG` replaces the referral tag. `BOT_TOKEN` registers a
    /// `telegram` channel only when no channel is configured yet.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tag) = lookup(ENV_AFFILIATE_TAG).filter(|t| !t.is_empty()) {
            self.referral.tag = Some(tag);
        }

        if self.channels.is_empty() {
            if let Some(token) = lookup(ENV_BOT_TOKEN).filter(|t| !t.is_empty()) {
                let settings =
                    HashMap::from([("bot_token".to_string(), serde_json::Value::String(token))]);
                self.channels.insert(
                    "telegram".to_string(),
                    ChannelConfig {
                        channel_type: "telegram".to_string(),
                        enabled: true,
                        settings,
                    },
                );
            }
        }
    }
}

/// Resolve the reflink config directory (~/.reflink/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".reflink"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.reflink/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path and the process environment.
pub fn load_config() -> Result<ReflinkConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    let mut config = load_config_from(&path)?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<ReflinkConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(ReflinkConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: ReflinkConfig = json5::from_str(&content)?;
    Ok(config)
}
