//! Navigators for static HTML listings.

use async_trait::async_trait;
use reqwest::Url;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::fetcher::Fetcher;
use super::page::{parse_url, HtmlPage};
use crate::crawl::{Navigator, NextPage};
use crate::errors::{ConfigurationError, NavigationFault, PageflowError};
use crate::extract::compile_selector;

/// Placeholder replaced by the page number in URL templates.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// How a listing is paginated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaginationSpec {
    /// One page only.
    #[default]
    Single,
    /// Follow a "next" link.
    NextLink {
        /// Selector of the next link (an element with `href`).
        selector: String,
        /// Selector whose presence marks the last page, e.g. a disabled next control.
        #[serde(default)]
        terminal_selector: Option<String>,
    },
    /// Substitute the page number into a URL.
    UrlTemplate {
        /// URL containing `{page}`.
        template: String,
    },
}

impl PaginationSpec {
    /// Rejects specs that cannot be compiled.
    pub fn validate(&self) -> Result<(), PageflowError> {
        match self {
            Self::Single => {}
            Self::NextLink {
                selector,
                terminal_selector,
            } => {
                compile_selector(selector)?;
                if let Some(terminal) = terminal_selector {
                    compile_selector(terminal)?;
                }
            }
            Self::UrlTemplate { template } => {
                if !template.contains(PAGE_PLACEHOLDER) {
                    return Err(ConfigurationError::new(
                        "pagination.template",
                        format!("must contain {PAGE_PLACEHOLDER}"),
                    )
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Page number of `start_url`.
    ///
    /// A URL template yields the number found in the start URL, so a crawl
    /// started at `/page/3/` continues with page 4. Anything else is page 1.
    #[must_use]
    pub fn start_number(&self, start_url: &str) -> usize {
        match self {
            Self::UrlTemplate { template } => page_number_of(template, start_url).unwrap_or(1),
            _ => 1,
        }
    }
}

/// Reads the page number back out of a URL built from `template`.
fn page_number_of(template: &str, url: &str) -> Option<usize> {
    let (prefix, suffix) = template.split_once(PAGE_PLACEHOLDER)?;
    let number = url.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    number.parse().ok()
}

async fn fetch_successor(fetcher: &dyn Fetcher, current: &HtmlPage, url: &str) -> Result<HtmlPage, NavigationFault> {
    debug!(from = current.number(), url = %url, "Fetching next page");
    let fetched = fetcher.fetch(url).await?;
    let final_url = parse_url(&fetched.final_url)?;
    if current.has_visited(&final_url) {
        return Err(NavigationFault::permanent(format!("{final_url} was already crawled")));
    }
    Ok(current.successor(final_url, fetched.text))
}

/// Follows a "next" link on each page.
///
/// A page matching the terminal selector, a page with no next link, or a
/// page whose next link points at an already crawled URL is the last page.
pub struct LinkNavigator {
    fetcher: Arc<dyn Fetcher>,
    next: Selector,
    terminal: Option<Selector>,
}

impl std::fmt::Debug for LinkNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkNavigator")
            .field("next", &self.next)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

impl LinkNavigator {
    /// Compiles the link selectors.
    pub fn new(fetcher: Arc<dyn Fetcher>, next: &str, terminal: Option<&str>) -> Result<Self, PageflowError> {
        Ok(Self {
            fetcher,
            next: compile_selector(next)?,
            terminal: terminal.map(compile_selector).transpose()?,
        })
    }

    fn next_url(&self, page: &HtmlPage) -> Result<Option<Url>, NavigationFault> {
        let document = page.document();
        let Some(href) = document
            .select(&self.next)
            .find_map(|link| link.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
        else {
            return Ok(None);
        };
        page.url()
            .join(href)
            .map(Some)
            .map_err(|e| NavigationFault::permanent(format!("bad next link '{href}': {e}")))
    }

    fn has_terminal_marker(&self, page: &HtmlPage) -> bool {
        self.terminal
            .as_ref()
            .is_some_and(|marker| page.document().select(marker).next().is_some())
    }
}

#[async_trait]
impl Navigator<HtmlPage> for LinkNavigator {
    async fn has_next(&self, current: &HtmlPage) -> NextPage {
        if self.has_terminal_marker(current) {
            return NextPage::Terminal;
        }
        match self.next_url(current) {
            Ok(Some(url)) if current.has_visited(&url) => {
                debug!(page = current.number(), url = %url, "Next link loops back to a crawled page");
                NextPage::Terminal
            }
            Ok(Some(_)) => NextPage::Available,
            Ok(None) => NextPage::Terminal,
            Err(_) => NextPage::Unknown,
        }
    }

    async fn advance(&self, current: &HtmlPage) -> Result<HtmlPage, NavigationFault> {
        let url = self
            .next_url(current)?
            .ok_or_else(|| NavigationFault::permanent(format!("no next link on page {}", current.number())))?;
        if current.has_visited(&url) {
            return Err(NavigationFault::permanent(format!(
                "next link on page {} loops back to {url}",
                current.number()
            )));
        }
        fetch_successor(self.fetcher.as_ref(), current, url.as_str()).await
    }
}

/// Builds page URLs from a template such as `https://host/page/{page}`.
///
/// Cannot know whether a further page exists; the crawl ends on an empty
/// page or a failed fetch.
pub struct TemplateNavigator {
    fetcher: Arc<dyn Fetcher>,
    template: String,
}

impl std::fmt::Debug for TemplateNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateNavigator")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

impl TemplateNavigator {
    /// Creates a navigator; the template must contain `{page}`.
    pub fn new(fetcher: Arc<dyn Fetcher>, template: impl Into<String>) -> Result<Self, ConfigurationError> {
        let template = template.into();
        if !template.contains(PAGE_PLACEHOLDER) {
            return Err(ConfigurationError::new(
                "pagination.template",
                format!("must contain {PAGE_PLACEHOLDER}"),
            ));
        }
        Ok(Self { fetcher, template })
    }

    /// URL of page `number`.
    #[must_use]
    pub fn url_for(&self, number: usize) -> String {
        self.template.replace(PAGE_PLACEHOLDER, &number.to_string())
    }

    /// Page number encoded in `url`, if it was built from this template.
    #[must_use]
    pub fn page_number_of(&self, url: &str) -> Option<usize> {
        page_number_of(&self.template, url)
    }
}

#[async_trait]
impl Navigator<HtmlPage> for TemplateNavigator {
    async fn has_next(&self, _current: &HtmlPage) -> NextPage {
        NextPage::Unknown
    }

    async fn advance(&self, current: &HtmlPage) -> Result<HtmlPage, NavigationFault> {
        let url = self.url_for(current.number() + 1);
        fetch_successor(self.fetcher.as_ref(), current, &url).await
    }
}

/// A listing with exactly one page.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleNavigator;

#[async_trait]
impl Navigator<HtmlPage> for SingleNavigator {
    async fn has_next(&self, _current: &HtmlPage) -> NextPage {
        NextPage::Terminal
    }

    async fn advance(&self, _current: &HtmlPage) -> Result<HtmlPage, NavigationFault> {
        Err(NavigationFault::permanent("single-page listing"))
    }
}

/// Any of the HTML navigators, chosen by a [`PaginationSpec`].
#[derive(Debug)]
pub enum WebNavigator {
    /// One page only.
    Single(SingleNavigator),
    /// Next-link pagination.
    Link(LinkNavigator),
    /// URL template pagination.
    Template(TemplateNavigator),
}

impl WebNavigator {
    /// Builds the navigator described by `spec`.
    pub fn from_spec(spec: &PaginationSpec, fetcher: Arc<dyn Fetcher>) -> Result<Self, PageflowError> {
        Ok(match spec {
            PaginationSpec::Single => Self::Single(SingleNavigator),
            PaginationSpec::NextLink {
                selector,
                terminal_selector,
            } => Self::Link(LinkNavigator::new(fetcher, selector, terminal_selector.as_deref())?),
            PaginationSpec::UrlTemplate { template } => Self::Template(TemplateNavigator::new(fetcher, template.clone())?),
        })
    }
}

#[async_trait]
impl Navigator<HtmlPage> for WebNavigator {
    async fn has_next(&self, current: &HtmlPage) -> NextPage {
        match self {
            Self::Single(nav) => nav.has_next(current).await,
            Self::Link(nav) => nav.has_next(current).await,
            Self::Template(nav) => nav.has_next(current).await,
        }
    }

    async fn advance(&self, current: &HtmlPage) -> Result<HtmlPage, NavigationFault> {
        match self {
            Self::Single(nav) => nav.advance(current).await,
            Self::Link(nav) => nav.advance(current).await,
            Self::Template(nav) => nav.advance(current).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;
    use crate::testing::InMemoryFetcher;

    fn listing(n: usize, next: Option<&str>) -> String {
        let next = next.map_or_else(
            || r#"<li class="next disabled"><span>next</span></li>"#.to_string(),
            |href| format!(r#"<li class="next"><a href="{href}">next</a></li>"#),
        );
        format!(r#"<html><body><article class="product_pod"><h3>Book {n}</h3></article><ul class="pager">{next}</ul></body></html>"#)
    }

    fn page(url: &str, number: usize, body: String) -> HtmlPage {
        HtmlPage::parse(url, number, body, "article.product_pod").unwrap()
    }

    #[tokio::test]
    async fn test_link_navigator_follows_relative_links() {
        let fetcher = Arc::new(
            InMemoryFetcher::new().with_page("https://books.toscrape.com/catalogue/page-2.html", listing(2, None)),
        );
        let nav = LinkNavigator::new(fetcher.clone(), "li.next > a", Some("li.next.disabled")).unwrap();
        let first = page("https://books.toscrape.com/catalogue/page-1.html", 1, listing(1, Some("page-2.html")));

        assert_eq!(nav.has_next(&first).await, NextPage::Available);
        let second = nav.advance(&first).await.unwrap();
        assert_eq!(second.number(), 2);
        assert_eq!(second.url().as_str(), "https://books.toscrape.com/catalogue/page-2.html");
        assert_eq!(nav.has_next(&second).await, NextPage::Terminal);
        assert_eq!(fetcher.requests(), vec!["https://books.toscrape.com/catalogue/page-2.html"]);
    }

    #[tokio::test]
    async fn test_link_navigator_without_next_link_is_terminal() {
        let fetcher = Arc::new(InMemoryFetcher::new());
        let nav = LinkNavigator::new(fetcher, "li.next > a", None).unwrap();
        let last = page("https://example.com/", 1, "<article class=\"product_pod\"></article>".to_string());

        assert_eq!(nav.has_next(&last).await, NextPage::Terminal);
        let fault = nav.advance(&last).await.unwrap_err();
        assert!(!fault.is_transient());
    }

    #[tokio::test]
    async fn test_link_navigator_transient_status() {
        let fetcher = Arc::new(InMemoryFetcher::new().with_page("https://example.com/2", listing(2, None)));
        fetcher.fail_next(
            "https://example.com/2",
            FetchError::Status {
                url: "https://example.com/2".to_string(),
                status: 503,
                transient: true,
            },
        );
        let nav = LinkNavigator::new(fetcher, "li.next > a", None).unwrap();
        let first = page("https://example.com/1", 1, listing(1, Some("/2")));

        assert!(nav.advance(&first).await.unwrap_err().is_transient());
        assert_eq!(nav.advance(&first).await.unwrap().number(), 2);
    }

    #[tokio::test]
    async fn test_template_navigator() {
        let fetcher = Arc::new(InMemoryFetcher::new().with_page("https://quotes.toscrape.com/page/2/", listing(2, None)));
        let nav = TemplateNavigator::new(fetcher, "https://quotes.toscrape.com/page/{page}/").unwrap();
        let first = page("https://quotes.toscrape.com/page/1/", 1, listing(1, None));

        assert_eq!(nav.has_next(&first).await, NextPage::Unknown);
        assert_eq!(nav.url_for(7), "https://quotes.toscrape.com/page/7/");
        let second = nav.advance(&first).await.unwrap();
        assert_eq!(second.number(), 2);

        let missing = nav.advance(&second).await.unwrap_err();
        assert!(!missing.is_transient());
    }

    #[tokio::test]
    async fn test_link_navigator_stops_on_self_link() {
        let fetcher = Arc::new(InMemoryFetcher::new());
        let nav = LinkNavigator::new(fetcher.clone(), "li.next > a", None).unwrap();
        let only = page("https://example.com/list", 1, listing(1, Some("/list#more")));

        assert_eq!(nav.has_next(&only).await, NextPage::Terminal);
        assert!(!nav.advance(&only).await.unwrap_err().is_transient());
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_link_navigator_stops_on_cycle() {
        let fetcher = Arc::new(
            InMemoryFetcher::new()
                .with_page("https://example.com/b", listing(2, Some("/c")))
                .with_page("https://example.com/c", listing(3, Some("/a"))),
        );
        let nav = LinkNavigator::new(fetcher, "li.next > a", None).unwrap();
        let a = page("https://example.com/a", 1, listing(1, Some("/b")));

        let b = nav.advance(&a).await.unwrap();
        assert_eq!(nav.has_next(&b).await, NextPage::Available);
        let c = nav.advance(&b).await.unwrap();
        assert_eq!(c.number(), 3);
        assert_eq!(nav.has_next(&c).await, NextPage::Terminal);
    }

    #[tokio::test]
    async fn test_redirect_to_crawled_page_is_permanent_fault() {
        let fetcher = Arc::new(
            InMemoryFetcher::new()
                .with_page("https://example.com/page/1/", listing(1, None))
                .with_redirect("https://example.com/page/2/", "https://example.com/page/1/"),
        );
        let nav = TemplateNavigator::new(fetcher, "https://example.com/page/{page}/").unwrap();
        let first = page("https://example.com/page/1/", 1, listing(1, None));

        let fault = nav.advance(&first).await.unwrap_err();
        assert!(!fault.is_transient());
        assert!(fault.message.contains("already crawled"));
    }

    #[test]
    fn test_page_number_of_template_url() {
        let fetcher = Arc::new(InMemoryFetcher::new());
        let nav = TemplateNavigator::new(fetcher, "https://quotes.toscrape.com/page/{page}/").unwrap();
        assert_eq!(nav.page_number_of("https://quotes.toscrape.com/page/3/"), Some(3));
        assert_eq!(nav.page_number_of("https://quotes.toscrape.com/page/x/"), None);
        assert_eq!(nav.page_number_of("https://quotes.toscrape.com/"), None);

        let spec = PaginationSpec::UrlTemplate {
            template: "https://example.com/list?p={page}".to_string(),
        };
        assert_eq!(spec.start_number("https://example.com/list?p=12"), 12);
        assert_eq!(spec.start_number("https://example.com/list"), 1);
        assert_eq!(PaginationSpec::Single.start_number("https://example.com/list?p=12"), 1);
    }

    #[test]
    fn test_template_requires_placeholder() {
        let fetcher = Arc::new(InMemoryFetcher::new());
        assert!(TemplateNavigator::new(fetcher, "https://example.com/page").is_err());
    }

    #[tokio::test]
    async fn test_web_navigator_from_spec() {
        let fetcher: Arc<dyn Fetcher> = Arc::new(InMemoryFetcher::new());
        let single = WebNavigator::from_spec(&PaginationSpec::Single, fetcher.clone()).unwrap();
        let first = page("https://example.com/", 1, listing(1, Some("/2")));
        assert_eq!(single.has_next(&first).await, NextPage::Terminal);

        let spec: PaginationSpec =
            serde_json::from_str(r#"{"kind": "next_link", "selector": "li.next > a"}"#).unwrap();
        let link = WebNavigator::from_spec(&spec, fetcher.clone()).unwrap();
        assert_eq!(link.has_next(&first).await, NextPage::Available);

        let bad = PaginationSpec::NextLink {
            selector: "li[".to_string(),
            terminal_selector: None,
        };
        assert!(bad.validate().is_err());
        assert!(WebNavigator::from_spec(&bad, fetcher).is_err());
    }
}
