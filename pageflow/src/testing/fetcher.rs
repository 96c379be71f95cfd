//! In-memory site for exercising the web adapters offline.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::errors::FetchError;
use crate::web::{FetchResult, Fetcher};

/// A [`Fetcher`] serving pages from a map.
///
/// Unknown URLs answer `404`. Queued errors for a URL are returned by the
/// next requests for it, one per request, before its page is served.
/// Redirects are followed once and reported through `final_url`.
#[derive(Debug, Default)]
pub struct InMemoryFetcher {
    pages: HashMap<String, String>,
    assets: HashMap<String, Vec<u8>>,
    redirects: HashMap<String, String>,
    failures: Mutex<HashMap<String, VecDeque<FetchError>>>,
    requests: Mutex<Vec<String>>,
}

impl InMemoryFetcher {
    /// Creates an empty site.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` at `url`.
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    /// Serves binary `bytes` at `url`.
    #[must_use]
    pub fn with_asset(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.assets.insert(url.into(), bytes.into());
        self
    }

    /// Answers requests for `from` with the page at `to`.
    #[must_use]
    pub fn with_redirect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.redirects.insert(from.into(), to.into());
        self
    }

    fn not_found(url: &str) -> FetchError {
        FetchError::Status {
            url: url.to_string(),
            status: 404,
            transient: false,
        }
    }

    /// Fails the next request for `url` with `error`.
    pub fn fail_next(&self, url: impl Into<String>, error: FetchError) {
        self.failures.lock().entry(url.into()).or_default().push_back(error);
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Fetcher for InMemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        self.requests.lock().push(url.to_string());
        if let Some(error) = self.failures.lock().get_mut(url).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        let final_url = self.redirects.get(url).map_or(url, String::as_str);
        let body = self.pages.get(final_url).ok_or_else(|| Self::not_found(url))?;
        Ok(FetchResult {
            status_code: 200,
            text: body.clone(),
            final_url: final_url.to_string(),
            content_type: Some("text/html; charset=utf-8".to_string()),
            duration_ms: 0.0,
        })
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().push(url.to_string());
        if let Some(error) = self.failures.lock().get_mut(url).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        self.assets.get(url).cloned().ok_or_else(|| Self::not_found(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_pages_and_queued_failures() {
        let fetcher = InMemoryFetcher::new().with_page("https://example.com/", "<p>hi</p>");
        fetcher.fail_next(
            "https://example.com/",
            FetchError::Transport {
                url: "https://example.com/".to_string(),
                message: "reset".to_string(),
                timeout: false,
            },
        );

        assert!(fetcher.fetch("https://example.com/").await.unwrap_err().is_transient());
        assert_eq!(fetcher.fetch("https://example.com/").await.unwrap().text, "<p>hi</p>");
        assert!(!fetcher.fetch("https://example.com/x").await.unwrap_err().is_transient());
        assert_eq!(fetcher.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_redirects_and_assets() {
        let fetcher = InMemoryFetcher::new()
            .with_page("https://example.com/new", "<p>moved</p>")
            .with_redirect("https://example.com/old", "https://example.com/new")
            .with_asset("https://example.com/a.png", vec![0x89, b'P', b'N', b'G']);

        let moved = fetcher.fetch("https://example.com/old").await.unwrap();
        assert_eq!(moved.final_url, "https://example.com/new");
        assert_eq!(moved.text, "<p>moved</p>");
        assert_eq!(fetcher.fetch_bytes("https://example.com/a.png").await.unwrap()[0], 0x89);
        assert!(fetcher.fetch_bytes("https://example.com/b.png").await.is_err());
    }
}
