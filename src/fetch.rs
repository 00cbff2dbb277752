// 🌐 Fetch Collaborator
// Outbound document fetches (source calendar + enrichment links)

use crate::error::{FeedError, FeedResult};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Default timeout for outbound fetches
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Body and status of a completed fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub text: String,
}

impl FetchResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        FetchResponse {
            status: 200,
            text: text.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetcher - injected document fetcher
///
/// Returns `Err` only when no response arrived (DNS, connect, timeout).
/// Non-2xx responses come back as `Ok` and are judged by the caller.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> FeedResult<FetchResponse>;
}

/// Fetch and require a 2xx status
pub fn fetch_success(fetcher: &dyn Fetcher, url: &str) -> FeedResult<String> {
    let response = fetcher.fetch(url)?;
    if !response.is_success() {
        return Err(FeedError::fetch(url, format!("HTTP {}", response.status)));
    }
    Ok(response.text)
}

// ============================================================================
// HTTP FETCHER (reqwest, blocking)
// ============================================================================

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> FeedResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> FeedResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("ics-feed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::fetch("<client>", e))?;

        Ok(HttpFetcher { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> FeedResult<FetchResponse> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FeedError::fetch(url, e))?;

        let status = response.status().as_u16();
        let text = response.text().map_err(|e| FeedError::fetch(url, e))?;

        debug!("GET {} → {} ({} bytes)", url, status, text.len());
        Ok(FetchResponse { status, text })
    }
}

// ============================================================================
// STATIC FETCHER (offline replay)
// ============================================================================

/// StaticFetcher - serves canned responses; unknown URLs fail like a DNS error
///
/// Records every requested URL so callers can assert on fetch order.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, FetchResponse>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: respond 200 with `text`
    pub fn with_page(self, url: &str, text: &str) -> Self {
        self.with_response(url, FetchResponse::ok(text))
    }

    /// Builder: respond with an arbitrary status/body
    pub fn with_response(mut self, url: &str, response: FetchResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> FeedResult<FetchResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| FeedError::fetch(url, "unreachable host"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(FetchResponse::ok("x").is_success());
        assert!(FetchResponse { status: 204, text: String::new() }.is_success());
        assert!(!FetchResponse { status: 404, text: String::new() }.is_success());
        assert!(!FetchResponse { status: 301, text: String::new() }.is_success());
    }

    #[test]
    fn test_fetch_success_rejects_non_2xx() {
        let fetcher = StaticFetcher::new().with_response(
            "http://e.com/missing",
            FetchResponse { status: 404, text: "nope".to_string() },
        );

        let err = fetch_success(&fetcher, "http://e.com/missing").unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch http://e.com/missing: HTTP 404");
    }

    #[test]
    fn test_static_fetcher_records_requests() {
        let fetcher = StaticFetcher::new().with_page("http://a", "A");

        assert_eq!(fetch_success(&fetcher, "http://a").unwrap(), "A");
        assert!(fetcher.fetch("http://b").is_err());
        assert_eq!(fetcher.requests(), vec!["http://a", "http://b"]);
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new().is_ok());
    }
}
