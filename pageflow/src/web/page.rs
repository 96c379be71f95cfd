//! A fetched HTML page as a crawl page source.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;

use super::fetcher::Fetcher;
use crate::crawl::PageSource;
use crate::errors::{FetchError, PageflowError};
use crate::extract::{compile_selector, HtmlItem};

/// Parses a URL, reporting failures as [`FetchError::InvalidUrl`].
pub(crate) fn parse_url(url: &str) -> Result<Url, FetchError> {
    Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// The URL with its fragment removed, as used for visit tracking.
fn visit_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.to_string()
}

/// One fetched page of a static HTML listing.
///
/// Pages reached from one another through [`successor`](Self::successor)
/// share the set of URLs visited so far, so navigators can refuse to loop.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    url: Url,
    number: usize,
    body: String,
    item_selector: Selector,
    visited: Arc<Mutex<HashSet<String>>>,
}

impl HtmlPage {
    /// Wraps an already fetched body, starting a new walk.
    #[must_use]
    pub fn new(url: Url, number: usize, body: String, item_selector: Selector) -> Self {
        let visited = HashSet::from([visit_key(&url)]);
        Self {
            url,
            number,
            body,
            item_selector,
            visited: Arc::new(Mutex::new(visited)),
        }
    }

    /// Wraps a body, compiling the item selector.
    pub fn parse(url: &str, number: usize, body: impl Into<String>, item_selector: &str) -> Result<Self, PageflowError> {
        Ok(Self::new(parse_url(url)?, number, body.into(), compile_selector(item_selector)?))
    }

    /// Fetches the first page of a crawl as page 1.
    pub async fn open<F>(fetcher: &F, url: &str, item_selector: &str) -> Result<Self, PageflowError>
    where
        F: Fetcher + ?Sized,
    {
        Self::open_at(fetcher, url, 1, item_selector).await
    }

    /// Fetches the first page of a crawl that starts at page `number`.
    pub async fn open_at<F>(fetcher: &F, url: &str, number: usize, item_selector: &str) -> Result<Self, PageflowError>
    where
        F: Fetcher + ?Sized,
    {
        let selector = compile_selector(item_selector)?;
        let fetched = fetcher.fetch(url).await?;
        let page = Self::new(parse_url(&fetched.final_url)?, number, fetched.text, selector);
        if let Ok(requested) = parse_url(url) {
            page.visited.lock().insert(visit_key(&requested));
        }
        Ok(page)
    }

    /// The page that follows this one, sharing the item selector and the
    /// visited set.
    #[must_use]
    pub fn successor(&self, url: Url, body: String) -> Self {
        self.visited.lock().insert(visit_key(&url));
        Self {
            url,
            number: self.number + 1,
            body,
            item_selector: self.item_selector.clone(),
            visited: Arc::clone(&self.visited),
        }
    }

    /// Returns true if `url` was already crawled in this walk.
    #[must_use]
    pub fn has_visited(&self, url: &Url) -> bool {
        self.visited.lock().contains(&visit_key(url))
    }

    /// The page URL after redirects.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// 1-based page number.
    #[must_use]
    pub const fn number(&self) -> usize {
        self.number
    }

    /// The raw HTML body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parses the body.
    #[must_use]
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Items on this page in document order.
    #[must_use]
    pub fn html_items(&self) -> Vec<HtmlItem> {
        let document = self.document();
        document
            .select(&self.item_selector)
            .map(|element| HtmlItem::from_element(element, Some(&self.url)))
            .collect()
    }
}

#[async_trait]
impl PageSource for HtmlPage {
    type Item = HtmlItem;

    async fn items(&self) -> Vec<HtmlItem> {
        self.html_items()
    }

    fn location(&self) -> Option<String> {
        Some(self.url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryFetcher;

    const PAGE: &str = r#"<html><body>
        <div class="quote"><span class="text">“Simplicity is prerequisite.”</span></div>
        <div class="quote"><span class="text">“Be yourself.”</span></div>
    </body></html>"#;

    #[tokio::test]
    async fn test_open_and_items() {
        let fetcher = InMemoryFetcher::new().with_page("https://quotes.toscrape.com/", PAGE);
        let page = HtmlPage::open(&fetcher, "https://quotes.toscrape.com/", "div.quote")
            .await
            .unwrap();

        assert_eq!(page.number(), 1);
        assert_eq!(page.location().as_deref(), Some("https://quotes.toscrape.com/"));
        let items = page.items().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].tag(), "div");
        assert_eq!(items[1].base_url().map(Url::as_str), Some("https://quotes.toscrape.com/"));
    }

    #[tokio::test]
    async fn test_open_rejects_bad_selector_before_fetching() {
        let fetcher = InMemoryFetcher::new().with_page("https://quotes.toscrape.com/", PAGE);
        let err = HtmlPage::open(&fetcher, "https://quotes.toscrape.com/", "div[").await.unwrap_err();
        assert!(matches!(err, PageflowError::Selector(_)));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_open_missing_page() {
        let fetcher = InMemoryFetcher::new();
        let err = HtmlPage::open(&fetcher, "https://quotes.toscrape.com/", "div.quote").await.unwrap_err();
        assert!(matches!(err, PageflowError::Fetch(FetchError::Status { status: 404, .. })));
    }

    #[test]
    fn test_successors_share_visited_urls() {
        let first = HtmlPage::parse("https://example.com/list?p=1", 1, "", "li").unwrap();
        assert!(first.has_visited(&parse_url("https://example.com/list?p=1#top").unwrap()));

        let second = first.successor(parse_url("https://example.com/list?p=2").unwrap(), String::new());
        assert!(first.has_visited(second.url()));
        assert!(second.has_visited(first.url()));

        let fresh = HtmlPage::parse("https://example.com/list?p=2", 1, "", "li").unwrap();
        assert!(!fresh.has_visited(first.url()));
    }

    #[tokio::test]
    async fn test_open_at_keeps_page_number() {
        let fetcher = InMemoryFetcher::new().with_page("https://quotes.toscrape.com/page/3/", PAGE);
        let page = HtmlPage::open_at(&fetcher, "https://quotes.toscrape.com/page/3/", 3, "div.quote")
            .await
            .unwrap();
        assert_eq!(page.number(), 3);
    }

    #[test]
    fn test_page_without_items() {
        let page = HtmlPage::parse("https://example.com/page/9", 9, "<p>No quotes found!</p>", "div.quote").unwrap();
        assert!(page.html_items().is_empty());
        let next = page.successor(parse_url("https://example.com/page/10").unwrap(), String::new());
        assert_eq!(next.number(), 10);
    }
}
