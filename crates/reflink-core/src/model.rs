//! Processed link outcome.

use serde::Serialize;

/// How a candidate URL was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Regular `amazon.<tld>/dp/` or `/gp/product/` link.
    StandardProduct,
    /// `a.co` short link.
    Shortened,
    /// Not a link to the product site.
    NonMatching,
    /// Could not determine type (empty input).
    Unknown,
}

/// The parts of a successful outcome. They always exist together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Referral {
    pub product_id: String,
    pub domain: String,
    pub referral_url: String,
}

/// Result of running one candidate URL through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedLink {
    original_url: String,
    final_url: String,
    link_type: LinkType,
    referral: Option<Referral>,
}

impl ProcessedLink {
    pub fn success(
        original_url: impl Into<String>,
        final_url: impl Into<String>,
        link_type: LinkType,
        referral: Referral,
    ) -> Self {
        Self {
            original_url: original_url.into(),
            final_url: final_url.into(),
            link_type,
            referral: Some(referral),
        }
    }

    pub fn failed(
        original_url: impl Into<String>,
        final_url: impl Into<String>,
        link_type: LinkType,
    ) -> Self {
        Self {
            original_url: original_url.into(),
            final_url: final_url.into(),
            link_type,
            referral: None,
        }
    }

    /// The URL exactly as it appeared in the message.
    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    /// The URL after redirect resolution. Same as the original for standard links.
    pub fn final_url(&self) -> &str {
        &self.final_url
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn succeeded(&self) -> bool {
        self.referral.is_some()
    }

    pub fn product_id(&self) -> Option<&str> {
        self.referral.as_ref().map(|r| r.product_id.as_str())
    }

    pub fn domain(&self) -> Option<&str> {
        self.referral.as_ref().map(|r| r.domain.as_str())
    }

    pub fn referral_url(&self) -> Option<&str> {
        self.referral.as_ref().map(|r| r.referral_url.as_str())
    }
}
