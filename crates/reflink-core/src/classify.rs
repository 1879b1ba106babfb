//! Link classification and ASIN extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::model::LinkType;

/// `a.co` short links.
static SHORT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)https?://a\.co/.*$").expect("valid short link pattern"));

/// Matched case-insensitively; the ASIN is uppercased after capture.
static PRODUCT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?i)https?://(?:www\.)?(amazon\.[a-z.]{2,6}|a\.[a-z.]{2,6}).*?(?:/dp/|/gp/product/)([A-Z0-9]{10}).*$",
    )
    .expect("valid product link pattern")
});

/// Domain variant and ASIN captured from a product URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    /// Lowercased domain, e.g. `amazon.co.uk`.
    pub domain: String,
    pub product_id: String,
}

/// Outcome of classifying one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Product site link. `product` is `None` when the domain is present but
    /// no ASIN could be extracted.
    StandardProduct { product: Option<ProductRef> },
    Shortened,
    NonMatching,
    Unknown,
}

impl Classification {
    pub fn link_type(&self) -> LinkType {
        match self {
            Self::StandardProduct { .. } => LinkType::StandardProduct,
            Self::Shortened => LinkType::Shortened,
            Self::NonMatching => LinkType::NonMatching,
            Self::Unknown => LinkType::Unknown,
        }
    }
}

/// Classify a single URL.
pub fn classify(url: &str) -> Classification {
    if url.is_empty() {
        return Classification::Unknown;
    }
    if SHORT_PATTERN.is_match(url) {
        return Classification::Shortened;
    }
    if let Some(product) = match_product(url) {
        return Classification::StandardProduct {
            product: Some(product),
        };
    }
    if mentions_product_site(url) {
        return Classification::StandardProduct { product: None };
    }
    Classification::NonMatching
}

/// Apply the strict product pattern only.
pub fn match_product(url: &str) -> Option<ProductRef> {
    let caps = PRODUCT_PATTERN.captures(url)?;
    Some(ProductRef {
        domain: caps[1].to_ascii_lowercase(),
        product_id: caps[2].to_ascii_uppercase(),
    })
}

/// Loose check: `amazon.` anywhere, or an `a.co` host.
fn mentions_product_site(url: &str) -> bool {
    if url.to_ascii_lowercase().contains("amazon.") {
        return true;
    }
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h == "a.co"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(domain: &str, id: &str) -> Classification {
        Classification::StandardProduct {
            product: Some(ProductRef {
                domain: domain.into(),
                product_id: id.into(),
            }),
        }
    }

    #[test]
    fn test_dp_link() {
        assert_eq!(
            classify("https://amazon.com/dp/B07XYZ1234"),
            product("amazon.com", "B07XYZ1234")
        );
    }

    #[test]
    fn test_gp_product_with_slug_and_query() {
        assert_eq!(
            classify("https://www.amazon.co.uk/Some-Item-Name/gp/product/B07DEF5678/ref=sr_1?th=1"),
            product("amazon.co.uk", "B07DEF5678")
        );
    }

    #[test]
    fn test_domain_case_insensitive() {
        assert_eq!(
            classify("HTTPS://AMAZON.COM/dp/B07XYZ1234"),
            classify("https://amazon.com/dp/B07XYZ1234")
        );
    }

    #[test]
    fn test_short_link() {
        assert_eq!(classify("https://a.co/d/3Fz9kQx"), Classification::Shortened);
        assert_eq!(classify("HTTP://A.CO/d/3Fz9kQx"), Classification::Shortened);
    }

    #[test]
    fn test_short_link_without_path_falls_back() {
        assert_eq!(
            classify("https://a.co"),
            Classification::StandardProduct { product: None }
        );
    }

    #[test]
    fn test_amazon_without_asin_is_fallback() {
        let c = classify("https://www.amazon.com/s?k=headphones");
        assert_eq!(c, Classification::StandardProduct { product: None });
        assert_eq!(c.link_type(), LinkType::StandardProduct);
    }

    #[test]
    fn test_lowercase_asin_matches() {
        assert_eq!(
            classify("https://amazon.com/dp/b07xyz1234"),
            product("amazon.com", "B07XYZ1234")
        );
        assert_eq!(
            classify("https://www.Amazon.de/GP/PRODUCT/b0abcdef12?psc=1"),
            product("amazon.de", "B0ABCDEF12")
        );
    }

    #[test]
    fn test_non_matching() {
        for url in ["https://google.com", "https://github.com", "https://wikipedia.com/wiki/A"] {
            let c = classify(url);
            assert_eq!(c, Classification::NonMatching, "{url}");
        }
    }

    #[test]
    fn test_empty_is_unknown() {
        assert_eq!(classify(""), Classification::Unknown);
        assert_eq!(classify("").link_type(), LinkType::Unknown);
    }

    #[test]
    fn test_match_product_ignores_short_links() {
        assert!(match_product("https://a.co/d/3Fz9kQx").is_none());
        assert_eq!(
            match_product("https://www.amazon.de/dp/B0ABCDEF12?psc=1"),
            Some(ProductRef {
                domain: "amazon.de".into(),
                product_id: "B0ABCDEF12".into(),
            })
        );
    }
}
