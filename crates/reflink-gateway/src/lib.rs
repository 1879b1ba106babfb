//! reflink-gateway: wires chat channels to the link processor.
//!
//! Provides:
//! - Channel plugin framework (`ChannelPlugin`, `ChannelManager`)
//! - Construction of the `LinkProcessor` from configuration
//! - The long-running bot entry point with graceful Ctrl-C shutdown

pub mod channel;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use reflink_config::ReflinkConfig;
use reflink_core::{LinkProcessor, RedirectResolver, ReferralTagger};
use reflink_types::ChannelConfig;

use channel::{ChannelManager, ChannelPlugin};

/// Builds a channel plugin from its ID and configuration.
pub type ChannelFactory =
    Box<dyn Fn(String, &ChannelConfig) -> anyhow::Result<Arc<dyn ChannelPlugin>> + Send + Sync>;

/// Build the link processor described by `config`.
pub fn build_processor(config: &ReflinkConfig) -> anyhow::Result<LinkProcessor> {
    let resolver = RedirectResolver::http(
        Duration::from_secs(config.resolver.timeout_secs),
        config.resolver.max_hops,
    )
    .context("Failed to build redirect resolver")?;

    let tag = config.referral.tag().map(str::to_string);
    if tag.is_none() {
        warn!("No referral tag configured, links will be echoed unchanged");
    }

    Ok(LinkProcessor::new(resolver, ReferralTagger::new(tag)))
}

/// Register every enabled channel from `config` that has a factory.
pub async fn register_channels(
    channel_mgr: &ChannelManager,
    config: &ReflinkConfig,
    factories: &HashMap<String, ChannelFactory>,
) -> usize {
    let mut registered = 0;
    for (id, channel_config) in &config.channels {
        if !channel_config.enabled {
            info!(channel_id = %id, "Channel disabled, skipping");
            continue;
        }
        let Some(factory) = factories.get(&channel_config.channel_type) else {
            warn!(
                channel_id = %id,
                channel_type = %channel_config.channel_type,
                "No factory for channel type"
            );
            continue;
        };
        match factory(id.clone(), channel_config) {
            Ok(channel) => {
                channel_mgr.register(channel).await;
                registered += 1;
            }
            Err(e) => warn!(channel_id = %id, "Failed to create channel: {e}"),
        }
    }
    registered
}

/// Run the bot until Ctrl-C.
pub async fn start_gateway(
    config: ReflinkConfig,
    factories: HashMap<String, ChannelFactory>,
) -> anyhow::Result<()> {
    let processor = Arc::new(build_processor(&config)?);
    let channel_mgr = Arc::new(ChannelManager::new(256));

    if register_channels(&channel_mgr, &config, &factories).await == 0 {
        anyhow::bail!("No channels configured; set BOT_TOKEN or add a channel to the config file");
    }

    let loop_mgr = channel_mgr.clone();
    let loop_handle = tokio::spawn(async move {
        loop_mgr.run_message_loop(processor).await;
    });

    let started = channel_mgr.start_all().await;
    if started == 0 {
        loop_handle.abort();
        anyhow::bail!("No channel could be started");
    }
    info!(channels = started, "reflink running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    channel_mgr.stop_all().await;
    loop_handle.abort();
    Ok(())
}
