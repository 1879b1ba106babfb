mod process;

use std::collections::HashMap;

use clap::{Parser, Subcommand};

use reflink_config::ReflinkConfig;
use reflink_gateway::ChannelFactory;
use reflink_gateway::channel::ChannelManager;

#[derive(Parser)]
#[command(name = "reflink", about = "Referral link bot for chat channels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot on every configured channel
    Run,
    /// Run the link pipeline on a piece of text and print the replies
    Process {
        /// Message text to scan for links
        #[arg(short, long)]
        message: String,

        /// Referral tag (overrides AFFILIATE_TAG and the config file)
        #[arg(short, long)]
        tag: Option<String>,

        /// Print every processed link as JSON instead of reply text
        #[arg(long)]
        json: bool,
    },
    /// Follow the redirects of a URL and print the final destination
    Resolve {
        /// URL to resolve (e.g. an a.co short link)
        url: String,
    },
    /// Check configuration and list the channels that would run
    Health,
}

fn channel_factories() -> HashMap<String, ChannelFactory> {
    #[allow(unused_mut)]
    let mut factories: HashMap<String, ChannelFactory> = HashMap::new();
    #[cfg(feature = "channel-telegram")]
    factories.insert(
        "telegram".into(),
        Box::new(reflink_channel_telegram::create_telegram_channel),
    );
    factories
}

async fn health(config: ReflinkConfig) {
    println!("reflink is healthy");
    println!(
        "  referral tag: {}",
        config.referral.tag().unwrap_or("(none, links pass through)")
    );
    println!("  max redirect hops: {}", config.resolver.max_hops);
    println!("  hop timeout: {}s", config.resolver.timeout_secs);

    let channel_mgr = ChannelManager::new(1);
    reflink_gateway::register_channels(&channel_mgr, &config, &channel_factories()).await;
    let channels = channel_mgr.list_channels().await;
    println!("  channels: {}", channels.len());
    for ch in channels {
        println!("    {} ({})", ch.channel_id, ch.channel_type);
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = reflink_config::load_config()?;

    match cli.command {
        Commands::Run => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(reflink_gateway::start_gateway(config, channel_factories()))?;
        }
        Commands::Process { message, tag, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(process::run_process(config, message, tag, json))?;
        }
        Commands::Resolve { url } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(process::run_resolve(config, url))?;
        }
        Commands::Health => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(health(config));
        }
    }

    Ok(())
}
