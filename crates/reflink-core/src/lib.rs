//! reflink-core: product link detection and referral rewriting.
//!
//! Pipeline for one chat message:
//!
//! ```text
//! text
//!   ↓ extract::extract_urls
//! candidate URLs (in order)
//!   ↓ classify::classify
//! StandardProduct ──────────────┐
//! Shortened → resolve::RedirectResolver → classify::match_product
//!   ↓                             ↓
//! referral::ReferralTagger (tag=...)
//!   ↓
//! processor::LinkProcessor → "💰 <referral url>" replies
//! ```
//!
//! Only the redirect resolver touches the network. Everything else is a pure
//! function over a handful of compiled patterns.

pub mod classify;
pub mod extract;
pub mod model;
pub mod processor;
pub mod referral;
pub mod resolve;

pub use classify::{Classification, ProductRef, classify};
pub use extract::extract_urls;
pub use model::{LinkType, ProcessedLink, Referral};
pub use processor::{LinkProcessor, REPLY_PREFIX};
pub use referral::ReferralTagger;
pub use resolve::{HttpTransport, RedirectResolver, RedirectTransport, ResolveError};
