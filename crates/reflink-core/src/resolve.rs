//! Bounded manual redirect chase for short links.
//!
//! The HTTP client never follows redirects on its own; every hop is issued
//! here so the hop count and the status branching stay under our control.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::LOCATION;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

/// Upper bound on redirect hops followed per chase.
pub const MAX_REDIRECTS: usize = 5;

/// Upper bound on the per-hop connect and response timeout.
pub const HOP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Status code and `Location` header of a single hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopResponse {
    pub status: u16,
    pub location: Option<String>,
}

/// Issues one GET without following redirects.
#[async_trait]
pub trait RedirectTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HopResponse, ResolveError>;
}

/// `reqwest` transport with redirects disabled and no cookie store.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// A zero timeout, or one above `HOP_TIMEOUT`, is replaced by `HOP_TIMEOUT`.
    pub fn new(timeout: Duration) -> Result<Self, ResolveError> {
        let timeout = hop_timeout(timeout);
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(ResolveError::Client)?;
        Ok(Self { client })
    }
}

fn hop_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() || timeout > HOP_TIMEOUT {
        warn!(
            requested_ms = timeout.as_millis() as u64,
            "Hop timeout out of range, using {}s",
            HOP_TIMEOUT.as_secs()
        );
        return HOP_TIMEOUT;
    }
    timeout
}

#[async_trait]
impl RedirectTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<HopResponse, ResolveError> {
        let parsed = Url::parse(url).map_err(|source| ResolveError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let resp = self.client.get(parsed).send().await.map_err(|e| {
            if e.is_timeout() {
                ResolveError::Timeout {
                    url: url.to_string(),
                }
            } else {
                ResolveError::Transport {
                    url: url.to_string(),
                    source: Box::new(e),
                }
            }
        })?;

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(HopResponse {
            status: resp.status().as_u16(),
            location,
        })
    }
}

/// Why a chase stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaseEnd {
    /// A 200 response.
    Reached,
    /// A 3xx response without a `Location` header.
    MissingLocation,
    /// Any status other than 200 or 3xx.
    UnexpectedStatus(u16),
    /// The hop budget ran out.
    HopLimit,
}

/// Last URL reached by a chase and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub url: String,
    pub hops: usize,
    pub end: ChaseEnd,
}

/// Follows redirects hop by hop up to `max_hops`.
#[derive(Clone)]
pub struct RedirectResolver {
    transport: Arc<dyn RedirectTransport>,
    max_hops: usize,
}

impl RedirectResolver {
    /// `max_hops` is clamped to `1..=MAX_REDIRECTS`.
    pub fn new(transport: Arc<dyn RedirectTransport>, max_hops: usize) -> Self {
        let clamped = max_hops.clamp(1, MAX_REDIRECTS);
        if clamped != max_hops {
            warn!(requested = max_hops, using = clamped, "Redirect hop limit out of range");
        }
        Self {
            transport,
            max_hops: clamped,
        }
    }

    /// Resolver over a real HTTP client with the given per-hop timeout.
    pub fn http(timeout: Duration, max_hops: usize) -> Result<Self, ResolveError> {
        Ok(Self::new(Arc::new(HttpTransport::new(timeout)?), max_hops))
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Run the chase and report how it ended. Transport errors are returned as-is.
    pub async fn chase(&self, start_url: &str) -> Result<Resolution, ResolveError> {
        let mut current = start_url.to_string();
        let mut hops = 0;

        while hops < self.max_hops {
            debug!(hop = hops + 1, url = %current, "Following redirect");

            let resp = self.transport.get(&current).await?;

            match resp.status {
                300..=399 => {
                    let Some(location) = resp.location else {
                        warn!(status = resp.status, url = %current, "Redirect response without Location header");
                        return Ok(Resolution {
                            url: current,
                            hops,
                            end: ChaseEnd::MissingLocation,
                        });
                    };
                    current = absolutize(&current, location)?;
                    hops += 1;
                    debug!(url = %current, "Redirected");
                }
                200 => {
                    debug!(url = %current, "Final destination reached");
                    return Ok(Resolution {
                        url: current,
                        hops,
                        end: ChaseEnd::Reached,
                    });
                }
                status => {
                    warn!(status, url = %current, "Unexpected status code");
                    return Ok(Resolution {
                        url: current,
                        hops,
                        end: ChaseEnd::UnexpectedStatus(status),
                    });
                }
            }
        }

        warn!(
            max_hops = self.max_hops,
            url = start_url,
            "Maximum redirects reached"
        );
        Ok(Resolution {
            url: current,
            hops,
            end: ChaseEnd::HopLimit,
        })
    }

    /// Final destination of `url`, or `url` itself when the chase fails.
    pub async fn follow_redirects(&self, url: &str) -> String {
        if url.is_empty() {
            return String::new();
        }

        match self.chase(url).await {
            Ok(resolution) => resolution.url,
            Err(e) => {
                error!(url, "Error following redirects: {e}");
                url.to_string()
            }
        }
    }
}

/// Resolve a path-only `Location` against the current URL's origin.
fn absolutize(current: &str, location: String) -> Result<String, ResolveError> {
    if !location.starts_with('/') {
        return Ok(location);
    }
    let base = Url::parse(current).map_err(|source| ResolveError::InvalidUrl {
        url: current.to_string(),
        source,
    })?;
    base.join(&location)
        .map(String::from)
        .map_err(|source| ResolveError::InvalidUrl {
            url: location,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replays canned responses and records every requested URL.
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<HopResponse, ResolveError>>>,
        requested: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<HopResponse, ResolveError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requested: Mutex::new(Vec::new()),
            })
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RedirectTransport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<HopResponse, ResolveError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(HopResponse {
                    status: 200,
                    location: None,
                }))
        }
    }

    fn redirect(location: &str) -> Result<HopResponse, ResolveError> {
        Ok(HopResponse {
            status: 301,
            location: Some(location.to_string()),
        })
    }

    fn status(code: u16) -> Result<HopResponse, ResolveError> {
        Ok(HopResponse {
            status: code,
            location: None,
        })
    }

    #[tokio::test]
    async fn test_follows_to_final_destination() {
        let transport = ScriptedTransport::new(vec![
            redirect("https://www.amazon.com/dp/B07XYZ1234?ref=share"),
            status(200),
        ]);
        let resolver = RedirectResolver::new(transport.clone(), MAX_REDIRECTS);

        let resolution = resolver.chase("https://a.co/d/abc").await.unwrap();
        assert_eq!(resolution.url, "https://www.amazon.com/dp/B07XYZ1234?ref=share");
        assert_eq!(resolution.hops, 1);
        assert_eq!(resolution.end, ChaseEnd::Reached);
        assert_eq!(transport.requested().len(), 2);
    }

    #[tokio::test]
    async fn test_relative_location_uses_current_origin() {
        let transport = ScriptedTransport::new(vec![redirect("/dp/B07XYZ1234"), status(200)]);
        let resolver = RedirectResolver::new(transport.clone(), MAX_REDIRECTS);

        let url = resolver.follow_redirects("https://a.co/d/abc").await;
        assert_eq!(url, "https://a.co/dp/B07XYZ1234");
        assert_eq!(transport.requested()[1], "https://a.co/dp/B07XYZ1234");
    }

    #[tokio::test]
    async fn test_missing_location_stops_at_current() {
        let transport = ScriptedTransport::new(vec![
            redirect("https://www.amazon.com/gp/r.html"),
            status(302),
        ]);
        let resolver = RedirectResolver::new(transport, MAX_REDIRECTS);

        let resolution = resolver.chase("https://a.co/d/abc").await.unwrap();
        assert_eq!(resolution.url, "https://www.amazon.com/gp/r.html");
        assert_eq!(resolution.end, ChaseEnd::MissingLocation);
    }

    #[tokio::test]
    async fn test_unexpected_status_stops() {
        let transport = ScriptedTransport::new(vec![status(404)]);
        let resolver = RedirectResolver::new(transport, MAX_REDIRECTS);

        let resolution = resolver.chase("https://a.co/d/gone").await.unwrap();
        assert_eq!(resolution.url, "https://a.co/d/gone");
        assert_eq!(resolution.end, ChaseEnd::UnexpectedStatus(404));
    }

    #[tokio::test]
    async fn test_hop_limit_bounds_requests() {
        let responses = (0..10)
            .map(|i| redirect(&format!("https://loop.example/{i}")))
            .collect();
        let transport = ScriptedTransport::new(responses);
        let resolver = RedirectResolver::new(transport.clone(), MAX_REDIRECTS);

        let resolution = resolver.chase("https://a.co/d/loop").await.unwrap();
        assert_eq!(resolution.end, ChaseEnd::HopLimit);
        assert_eq!(resolution.hops, MAX_REDIRECTS);
        assert_eq!(resolution.url, "https://loop.example/4");
        assert_eq!(transport.requested().len(), MAX_REDIRECTS);
    }

    #[tokio::test]
    async fn test_hop_limit_is_capped() {
        let responses = (0..30)
            .map(|i| redirect(&format!("https://loop.example/{i}")))
            .collect();
        let transport = ScriptedTransport::new(responses);
        let resolver = RedirectResolver::new(transport.clone(), 20);
        assert_eq!(resolver.max_hops(), MAX_REDIRECTS);

        let resolution = resolver.chase("https://a.co/d/loop").await.unwrap();
        assert_eq!(resolution.hops, MAX_REDIRECTS);
        assert_eq!(transport.requested().len(), MAX_REDIRECTS);
    }

    #[tokio::test]
    async fn test_zero_hop_limit_still_follows_one() {
        let transport = ScriptedTransport::new(vec![redirect("https://www.amazon.com/dp/B07XYZ1234")]);
        let resolver = RedirectResolver::new(transport.clone(), 0);
        assert_eq!(resolver.max_hops(), 1);

        let url = resolver.follow_redirects("https://a.co/d/abc").await;
        assert_eq!(url, "https://www.amazon.com/dp/B07XYZ1234");
    }

    #[test]
    fn test_hop_timeout_bounds() {
        assert_eq!(hop_timeout(Duration::ZERO), HOP_TIMEOUT);
        assert_eq!(hop_timeout(Duration::from_secs(600)), HOP_TIMEOUT);
        assert_eq!(hop_timeout(Duration::from_secs(3)), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_transport_error_returns_original() {
        let transport = ScriptedTransport::new(vec![
            redirect("https://www.amazon.com/dp/B07XYZ1234"),
            Err(ResolveError::Transport {
                url: "https://www.amazon.com/dp/B07XYZ1234".into(),
                source: "connection reset".into(),
            }),
        ]);
        let resolver = RedirectResolver::new(transport, MAX_REDIRECTS);

        let url = resolver.follow_redirects("https://a.co/d/abc").await;
        assert_eq!(url, "https://a.co/d/abc");
    }

    #[tokio::test]
    async fn test_empty_url_is_not_requested() {
        let transport = ScriptedTransport::new(vec![]);
        let resolver = RedirectResolver::new(transport.clone(), MAX_REDIRECTS);

        assert_eq!(resolver.follow_redirects("").await, "");
        assert!(transport.requested().is_empty());
    }

    #[tokio::test]
    async fn test_http_transport_does_not_auto_follow() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/d/abc"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", "/dp/B07XYZ1234?psc=1"),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/dp/B07XYZ1234"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new(HOP_TIMEOUT).unwrap();
        let hop = transport
            .get(&format!("{}/d/abc", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(hop.status, 301);
        assert_eq!(hop.location.as_deref(), Some("/dp/B07XYZ1234?psc=1"));

        let resolver = RedirectResolver::http(HOP_TIMEOUT, MAX_REDIRECTS).unwrap();
        let url = resolver
            .follow_redirects(&format!("{}/d/abc", mock_server.uri()))
            .await;
        assert_eq!(url, format!("{}/dp/B07XYZ1234?psc=1", mock_server.uri()));
    }

    #[tokio::test]
    async fn test_http_transport_connection_failure_falls_back() {
        let resolver = RedirectResolver::http(Duration::from_secs(2), MAX_REDIRECTS).unwrap();
        // Port 9 (discard) on localhost is not expected to accept connections.
        let url = resolver.follow_redirects("http://127.0.0.1:9/d/abc").await;
        assert_eq!(url, "http://127.0.0.1:9/d/abc");
    }

    #[test]
    fn test_absolutize_keeps_absolute_location() {
        let url = absolutize("https://a.co/d/abc", "https://www.amazon.com/dp/X".into()).unwrap();
        assert_eq!(url, "https://www.amazon.com/dp/X");
    }
}
