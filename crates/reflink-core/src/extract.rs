//! URL extraction from free-form message text.

use once_cell::sync::Lazy;
use regex::{Matches, Regex};

/// `http`/`https` followed by characters legal in a URL.
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://[A-Za-z0-9_\-.~:/?#\[\]@!$&'()*+,;=%]+").expect("valid URL pattern")
});

/// Lazy iterator over the URLs found in a piece of text, in order of appearance.
pub struct Urls<'t> {
    matches: Matches<'static, 't>,
}

impl<'t> Iterator for Urls<'t> {
    type Item = &'t str;

    fn next(&mut self) -> Option<Self::Item> {
        self.matches.next().map(|m| m.as_str())
    }
}

/// Scan `text` for URLs. Calling this again on the same text restarts the scan.
pub fn extract_urls(text: &str) -> Urls<'_> {
    Urls {
        matches: URL_PATTERN.find_iter(text),
    }
}
