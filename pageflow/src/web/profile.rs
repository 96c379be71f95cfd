//! Scrape profiles: one JSON file describing a whole crawl.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::fetcher::{FetchConfig, Fetcher, HttpFetcher};
use super::navigator::{PaginationSpec, WebNavigator};
use super::page::{parse_url, HtmlPage};
use crate::crawl::{CrawlConfig, CrawlEngine, CrawlReport};
use crate::errors::{ConfigurationError, PageflowError};
use crate::extract::{ExtractorSpec, SelectorExtractor};

/// Everything needed to crawl one listing.
///
/// ```json
/// {
///   "start_url": "https://books.toscrape.com/",
///   "crawl": {"max_pages": 3},
///   "extractor": {
///     "item_selector": "article.product_pod",
///     "fields": [{"name": "title", "selector": "h3 a", "source": {"kind": "attr", "name": "title"}}]
///   },
///   "pagination": {"kind": "next_link", "selector": "li.next > a"}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeProfile {
    /// First page of the listing.
    pub start_url: String,
    /// Crawl bounds.
    #[serde(default)]
    pub crawl: CrawlConfig,
    /// HTTP settings.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Items and fields.
    pub extractor: ExtractorSpec,
    /// How to reach the next page.
    #[serde(default)]
    pub pagination: PaginationSpec,
}

impl ScrapeProfile {
    /// Parses and validates a profile.
    pub fn from_json(json: &str) -> Result<Self, PageflowError> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Loads and validates a profile file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PageflowError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks every section.
    pub fn validate(&self) -> Result<(), PageflowError> {
        parse_url(&self.start_url)
            .map_err(|e| ConfigurationError::new("start_url", e.to_string()))?;
        self.crawl.validate()?;
        self.fetch.validate()?;
        self.extractor.validate()?;
        self.pagination.validate()?;
        Ok(())
    }

    /// Crawls the profile with `engine_setup` applied to the engine.
    ///
    /// Fetch and selector problems before the first page is loaded are
    /// errors; everything after is reported in the [`CrawlReport`].
    pub async fn run_with<F>(
        &self,
        fetcher: Arc<dyn Fetcher>,
        engine_setup: F,
    ) -> Result<CrawlReport, PageflowError>
    where
        F: FnOnce(CrawlEngine<SelectorExtractor>) -> CrawlEngine<SelectorExtractor>,
    {
        let extractor = SelectorExtractor::from_spec(&self.extractor)?;
        let engine = engine_setup(CrawlEngine::new(extractor, self.crawl.clone())?);
        let navigator = WebNavigator::from_spec(&self.pagination, fetcher.clone())?;
        let number = self.pagination.start_number(&self.start_url);
        let first = HtmlPage::open_at(fetcher.as_ref(), &self.start_url, number, &self.extractor.item_selector).await?;
        Ok(engine.crawl(first, &navigator).await)
    }

    /// Crawls the profile over HTTP.
    pub async fn run(&self) -> Result<CrawlReport, PageflowError> {
        let fetcher = Arc::new(HttpFetcher::new(self.fetch.clone())?);
        self.run_with(fetcher, |engine| engine).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::StopReason;
    use crate::testing::InMemoryFetcher;
    use pretty_assertions::assert_eq;

    const PROFILE: &str = r#"{
        "start_url": "https://quotes.toscrape.com/page/1/",
        "crawl": {"max_nav_retries": 2, "backoff_unit_ms": 10},
        "extractor": {
            "item_selector": "div.quote",
            "fields": [
                {"name": "text", "selector": "span.text", "required": true},
                {"name": "author", "selector": "small.author"}
            ]
        },
        "pagination": {"kind": "url_template", "template": "https://quotes.toscrape.com/page/{page}/"}
    }"#;

    fn quotes(items: &[(&str, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(text, author)| {
                format!(r#"<div class="quote"><span class="text">{text}</span><small class="author">{author}</small></div>"#)
            })
            .collect();
        format!("<html><body>{body}</body></html>")
    }

    #[test]
    fn test_profile_parses_with_defaults() {
        let profile = ScrapeProfile::from_json(PROFILE).unwrap();
        assert_eq!(profile.crawl.max_nav_retries, 2);
        assert_eq!(profile.crawl.max_pages, 0);
        assert_eq!(profile.fetch, FetchConfig::default());
        assert_eq!(profile.extractor.field_names(), vec!["text", "author"]);
    }

    #[test]
    fn test_profile_rejects_invalid_sections() {
        let bad_url = PROFILE.replace("https://quotes.toscrape.com/page/1/", "not a url");
        assert!(matches!(
            ScrapeProfile::from_json(&bad_url),
            Err(PageflowError::Configuration(_))
        ));

        let bad_retries = PROFILE.replace(r#""max_nav_retries": 2"#, r#""max_nav_retries": 0"#);
        assert!(ScrapeProfile::from_json(&bad_retries).is_err());

        let negative = PROFILE.replace(r#""max_nav_retries": 2"#, r#""max_nav_retries": -3"#);
        assert!(matches!(
            ScrapeProfile::from_json(&negative),
            Err(PageflowError::Serialization(_))
        ));
    }

    #[test]
    fn test_profile_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.json");
        std::fs::write(&path, PROFILE).unwrap();
        let profile = ScrapeProfile::from_file(&path).unwrap();
        assert_eq!(profile.start_url, "https://quotes.toscrape.com/page/1/");
    }

    #[tokio::test]
    async fn test_run_against_in_memory_site() {
        let fetcher = Arc::new(
            InMemoryFetcher::new()
                .with_page(
                    "https://quotes.toscrape.com/page/1/",
                    quotes(&[("“A”", "Albert Einstein"), ("“B”", "")]),
                )
                .with_page("https://quotes.toscrape.com/page/2/", quotes(&[("“C”", "Jane Austen")]))
                .with_page("https://quotes.toscrape.com/page/3/", quotes(&[])),
        );
        let profile = ScrapeProfile::from_json(PROFILE).unwrap();

        let report = profile.run_with(fetcher, |engine| engine).await.unwrap();

        assert_eq!(report.stop_reason, StopReason::SourceExhausted);
        assert_eq!(report.pages_visited, 2);
        let texts: Vec<_> = report.results.iter().map(|r| r.get("text").unwrap().to_string()).collect();
        assert_eq!(texts, vec!["“A”", "“B”", "“C”"]);
        assert_eq!(report.results[1].get("author"), None);
    }

    #[tokio::test]
    async fn test_run_from_later_start_page_moves_forward() {
        let fetcher = Arc::new(
            InMemoryFetcher::new()
                .with_page("https://quotes.toscrape.com/page/2/", quotes(&[("p2", "")]))
                .with_page("https://quotes.toscrape.com/page/3/", quotes(&[("p3", "")]))
                .with_page("https://quotes.toscrape.com/page/4/", quotes(&[("p4", "")])),
        );
        let mut profile = ScrapeProfile::from_json(PROFILE).unwrap();
        profile.start_url = "https://quotes.toscrape.com/page/3/".to_string();

        let report = profile.run_with(fetcher.clone(), |engine| engine).await.unwrap();

        let texts: Vec<_> = report.results.iter().map(|r| r.get("text").unwrap().to_string()).collect();
        assert_eq!(texts, vec!["p3", "p4"]);
        assert!(!fetcher.requests().contains(&"https://quotes.toscrape.com/page/2/".to_string()));
    }

    #[tokio::test]
    async fn test_run_stops_on_self_linking_page() {
        let page = r#"<html><body>
            <div class="quote"><span class="text">loop</span></div>
            <li class="next"><a href="/page/1/">Next</a></li>
        </body></html>"#;
        let fetcher = Arc::new(InMemoryFetcher::new().with_page("https://quotes.toscrape.com/page/1/", page));
        let mut profile = ScrapeProfile::from_json(PROFILE).unwrap();
        profile.crawl.max_pages = 50;
        profile.pagination = PaginationSpec::NextLink {
            selector: "li.next > a".to_string(),
            terminal_selector: None,
        };

        let report = profile.run_with(fetcher.clone(), |engine| engine).await.unwrap();

        assert_eq!(report.stop_reason, StopReason::LastPage);
        assert_eq!(report.pages_visited, 1);
        assert_eq!(report.results.len(), 1);
        assert_eq!(fetcher.requests().len(), 1);
    }
}
