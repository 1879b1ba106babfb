//! Referral tag rewriting.

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferralError {
    #[error("cannot tag an empty URL")]
    EmptyUrl,
    #[error("referral tag is empty")]
    EmptyTag,
}

/// A URL cut into the part before `?`, its query and its fragment.
struct UrlParts<'a> {
    base: &'a str,
    params: Vec<&'a str>,
    fragment: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    /// Split `url`, keeping every non-empty query parameter except `tag`.
    fn without_tag(url: &'a str) -> Self {
        let (rest, fragment) = match url.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (url, None),
        };
        let (base, query) = match rest.split_once('?') {
            Some((base, query)) => (base, query),
            None => (rest, ""),
        };
        let params = query
            .split('&')
            .filter(|p| !p.is_empty() && !is_tag_param(p))
            .collect();
        Self {
            base,
            params,
            fragment,
        }
    }

    fn assemble(&self) -> String {
        let mut url = self.base.to_string();
        if !self.params.is_empty() {
            url.push('?');
            url.push_str(&self.params.join("&"));
        }
        if let Some(fragment) = self.fragment {
            url.push('#');
            url.push_str(fragment);
        }
        url
    }
}

fn is_tag_param(param: &str) -> bool {
    param.split_once('=').map_or(param, |(key, _)| key) == "tag"
}

/// Remove every `tag=` query parameter from `url`.
pub fn strip_tag(url: &str) -> String {
    UrlParts::without_tag(url).assemble()
}

/// Replace any existing `tag=` parameter with `tag=<tag>`, form-urlencoded.
///
/// The new parameter goes last in the query, ahead of any `#fragment`.
pub fn try_apply_tag(url: &str, tag: &str) -> Result<String, ReferralError> {
    if url.is_empty() {
        return Err(ReferralError::EmptyUrl);
    }
    if tag.is_empty() {
        return Err(ReferralError::EmptyTag);
    }

    let encoded: String = url::form_urlencoded::byte_serialize(tag.as_bytes()).collect();
    let tag_param = format!("tag={encoded}");
    let mut parts = UrlParts::without_tag(url);
    parts.params.push(&tag_param);
    Ok(parts.assemble())
}

/// Applies the configured referral tag, passing URLs through unchanged when
/// no tag is configured.
#[derive(Debug, Clone, Default)]
pub struct ReferralTagger {
    tag: Option<String>,
}

impl ReferralTagger {
    pub fn new(tag: Option<String>) -> Self {
        Self {
            tag: tag.filter(|t| !t.is_empty()),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Tag `url`. Never fails: on bad input the original URL comes back.
    pub fn apply(&self, url: &str) -> String {
        let Some(tag) = self.tag.as_deref() else {
            debug!(url, "No referral tag configured, leaving URL unchanged");
            return url.to_string();
        };

        match try_apply_tag(url, tag) {
            Ok(tagged) => {
                debug!("Added referral tag to URL: {url} -> {tagged}");
                tagged
            }
            Err(e) => {
                warn!(url, "Cannot add referral tag: {e}");
                url.to_string()
            }
        }
    }
}
