//! Per-message link processing and reply formatting.

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::classify::{Classification, ProductRef, classify, match_product};
use crate::extract::extract_urls;
use crate::model::{LinkType, ProcessedLink, Referral};
use crate::referral::ReferralTagger;
use crate::resolve::RedirectResolver;

/// Prefix of every reply sent back to the chat.
pub const REPLY_PREFIX: &str = "💰 ";

/// Turns message text into referral links.
///
/// Holds no per-message state, so one instance can be shared across tasks.
#[derive(Clone)]
pub struct LinkProcessor {
    resolver: RedirectResolver,
    tagger: ReferralTagger,
}

impl LinkProcessor {
    pub fn new(resolver: RedirectResolver, tagger: ReferralTagger) -> Self {
        Self { resolver, tagger }
    }

    /// Process one message and return the reply texts, in link order.
    #[instrument(skip(self, text, conversation_id), fields(conversation = %conversation_id))]
    pub async fn handle(&self, text: &str, conversation_id: &str) -> Vec<String> {
        let links = self.process_message(text).await;
        let replies = format_replies(&links);
        if links.is_empty() {
            debug!("No product links found");
        } else {
            info!(
                links = links.len(),
                replies = replies.len(),
                "Processed product links"
            );
        }
        replies
    }

    /// Run every URL in `text` through the pipeline.
    ///
    /// Links to other sites are dropped. URLs are processed concurrently; the
    /// result keeps the order in which they appear in the text.
    pub async fn process_message(&self, text: &str) -> Vec<ProcessedLink> {
        if text.trim().is_empty() {
            debug!("Empty message received");
            return Vec::new();
        }

        let urls: Vec<&str> = extract_urls(text).collect();
        debug!(count = urls.len(), "Extracted URLs from message");

        join_all(urls.into_iter().map(|url| self.process_url(url)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Process a single URL. `None` means the URL is not a product site link.
    pub async fn process_url(&self, url: &str) -> Option<ProcessedLink> {
        let link = match classify(url) {
            Classification::StandardProduct { product } => self.process_standard(url, product),
            Classification::Shortened => self.process_shortened(url).await,
            Classification::NonMatching | Classification::Unknown => {
                debug!(url, "Ignoring non-product URL");
                return None;
            }
        };
        info!(url, success = link.succeeded(), "Processed product link");
        Some(link)
    }

    fn process_standard(&self, url: &str, product: Option<ProductRef>) -> ProcessedLink {
        match product {
            Some(product) => self.tagged(url, url, LinkType::StandardProduct, product),
            None => {
                debug!(url, "Product site URL without product id");
                ProcessedLink::failed(url, url, LinkType::StandardProduct)
            }
        }
    }

    async fn process_shortened(&self, url: &str) -> ProcessedLink {
        debug!(url, "Resolving short link");
        let final_url = self.resolver.follow_redirects(url).await;

        if final_url == url {
            warn!(url, "No redirect found for short link");
            return ProcessedLink::failed(url, final_url, LinkType::Shortened);
        }

        debug!(url, final_url = %final_url, "Short link resolved");
        match match_product(&final_url) {
            Some(product) => self.tagged(url, &final_url, LinkType::Shortened, product),
            None => ProcessedLink::failed(url, final_url, LinkType::Shortened),
        }
    }

    fn tagged(
        &self,
        original_url: &str,
        final_url: &str,
        link_type: LinkType,
        product: ProductRef,
    ) -> ProcessedLink {
        let referral_url = self.tagger.apply(final_url);
        info!(
            product_id = %product.product_id,
            domain = %product.domain,
            "Tagged product link"
        );
        ProcessedLink::success(
            original_url,
            final_url,
            link_type,
            Referral {
                product_id: product.product_id,
                domain: product.domain,
                referral_url,
            },
        )
    }
}

/// Reply text for a successful link, `None` for failures.
pub fn format_reply(link: &ProcessedLink) -> Option<String> {
    link.referral_url().map(|url| format!("{REPLY_PREFIX}{url}"))
}

/// Reply texts for all successful links, in order.
pub fn format_replies(links: &[ProcessedLink]) -> Vec<String> {
    links.iter().filter_map(format_reply).collect()
}
