use std::time::Duration;

use anyhow::{Context, Result};

use reflink_config::ReflinkConfig;
use reflink_core::processor::format_replies;
use reflink_core::{ProcessedLink, RedirectResolver};

/// Run the link pipeline on `message` and print the result.
pub async fn run_process(
    mut config: ReflinkConfig,
    message: String,
    tag: Option<String>,
    json: bool,
) -> Result<()> {
    if tag.is_some() {
        config.referral.tag = tag;
    }

    let processor = reflink_gateway::build_processor(&config)?;
    let links = processor.process_message(&message).await;

    for line in render(&links, json)? {
        println!("{line}");
    }
    if links.is_empty() {
        eprintln!("(no product links found)");
    }
    Ok(())
}

/// Follow redirects for `url` and print where it ends up.
pub async fn run_resolve(config: ReflinkConfig, url: String) -> Result<()> {
    let resolver = RedirectResolver::http(
        Duration::from_secs(config.resolver.timeout_secs),
        config.resolver.max_hops,
    )
    .context("Failed to build redirect resolver")?;

    let resolution = resolver
        .chase(&url)
        .await
        .with_context(|| format!("Failed to resolve {url}"))?;

    println!("{}", resolution.url);
    eprintln!("({} hops, {:?})", resolution.hops, resolution.end);
    Ok(())
}

/// Output lines: reply texts, or one JSON document per processed link.
fn render(links: &[ProcessedLink], json: bool) -> Result<Vec<String>> {
    if !json {
        return Ok(format_replies(links));
    }
    links
        .iter()
        .map(|link| serde_json::to_string(link).context("Failed to serialize link"))
        .collect()
}
