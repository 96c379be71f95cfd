//! Scripted collaborators for driving the crawl engine without a network.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::Instant;

use crate::crawl::{Navigator, NextPage, PageSource};
use crate::errors::{ItemExtractionFault, NavigationFault};
use crate::extract::{ExtractionResult, FieldExtractor};

/// An item whose extraction outcome is fixed in advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedItem {
    /// Raw values by field name; a missing name is an absent field.
    pub values: Vec<(String, String)>,
    /// When set, extraction fails with this reason.
    pub fault: Option<String>,
    /// When set, extraction panics.
    pub panics: bool,
}

impl ScriptedItem {
    /// An item with the given raw values.
    #[must_use]
    pub fn new<K: Into<String>, V: Into<String>>(values: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            fault: None,
            panics: false,
        }
    }

    /// An item with only a `title`.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self::new([("title", title.into())])
    }

    /// An item whose extraction fails.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            values: Vec::new(),
            fault: Some(reason.into()),
            panics: false,
        }
    }

    /// An item whose extraction panics.
    #[must_use]
    pub fn panicking() -> Self {
        Self {
            values: Vec::new(),
            fault: None,
            panics: true,
        }
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// A page holding a fixed list of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedPage {
    /// 1-based page number.
    pub number: usize,
    /// Items in page order.
    pub items: Vec<ScriptedItem>,
}

impl ScriptedPage {
    /// Creates a page.
    #[must_use]
    pub const fn new(number: usize, items: Vec<ScriptedItem>) -> Self {
        Self { number, items }
    }

    /// A page of items that only carry titles.
    #[must_use]
    pub fn titled(number: usize, titles: &[&str]) -> Self {
        Self::new(number, titles.iter().map(|t| ScriptedItem::titled(*t)).collect())
    }

    /// A page with no items.
    #[must_use]
    pub const fn empty(number: usize) -> Self {
        Self::new(number, Vec::new())
    }
}

#[async_trait]
impl PageSource for ScriptedPage {
    type Item = ScriptedItem;

    async fn items(&self) -> Vec<ScriptedItem> {
        self.items.clone()
    }

    fn location(&self) -> Option<String> {
        Some(format!("scripted://page/{}", self.number))
    }
}

/// Extractor that reads declared fields straight from [`ScriptedItem`]s.
#[derive(Debug)]
pub struct ScriptedExtractor {
    fields: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    /// Creates an extractor declaring `fields`.
    #[must_use]
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| (*f).to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `extract` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FieldExtractor<ScriptedItem> for ScriptedExtractor {
    fn field_names(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn extract(&self, item: &ScriptedItem) -> Result<ExtractionResult, ItemExtractionFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!item.panics, "scripted extractor panic");
        if let Some(reason) = &item.fault {
            return Err(ItemExtractionFault::new(reason.clone()));
        }
        Ok(ExtractionResult::from_fields(
            self.fields.iter().map(|name| (name.clone(), item.value(name))),
        ))
    }
}

/// Navigator walking a fixed list of pages, with scripted failures.
///
/// Page `n` advances to the `n + 1`th page of the list; past the end it
/// yields an empty page. Queued faults are returned by the next `advance`
/// calls, one per call, before any navigation succeeds.
#[derive(Debug)]
pub struct ScriptedNavigator {
    pages: Vec<ScriptedPage>,
    terminal_on: Option<usize>,
    beyond_last: NextPage,
    faults: Mutex<VecDeque<NavigationFault>>,
    attempts: Mutex<Vec<Instant>>,
    has_next_calls: AtomicUsize,
}

impl ScriptedNavigator {
    /// Creates a navigator over `pages`; the first is the starting page.
    #[must_use]
    pub fn new(pages: Vec<ScriptedPage>) -> Self {
        Self {
            pages,
            terminal_on: None,
            beyond_last: NextPage::Unknown,
            faults: Mutex::new(VecDeque::new()),
            attempts: Mutex::new(Vec::new()),
            has_next_calls: AtomicUsize::new(0),
        }
    }

    /// Reports a terminal marker on page `number`.
    #[must_use]
    pub fn terminal_on(mut self, number: usize) -> Self {
        self.terminal_on = Some(number);
        self
    }

    /// What `has_next` reports on the last page when no marker is set.
    #[must_use]
    pub fn beyond_last(mut self, next: NextPage) -> Self {
        self.beyond_last = next;
        self
    }

    /// Queues `count` copies of `fault` for the next `advance` calls.
    #[must_use]
    pub fn failing(self, count: usize, fault: &NavigationFault) -> Self {
        self.faults.lock().extend(std::iter::repeat(fault.clone()).take(count));
        self
    }

    /// The starting page.
    #[must_use]
    pub fn first_page(&self) -> ScriptedPage {
        self.pages.first().cloned().unwrap_or_else(|| ScriptedPage::empty(1))
    }

    /// Number of `advance` calls so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.lock().len()
    }

    /// When each `advance` call happened.
    #[must_use]
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }

    /// Number of `has_next` calls so far.
    #[must_use]
    pub fn has_next_calls(&self) -> usize {
        self.has_next_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Navigator<ScriptedPage> for ScriptedNavigator {
    async fn has_next(&self, current: &ScriptedPage) -> NextPage {
        self.has_next_calls.fetch_add(1, Ordering::SeqCst);
        if self.terminal_on == Some(current.number) {
            NextPage::Terminal
        } else if current.number < self.pages.len() {
            NextPage::Available
        } else {
            self.beyond_last
        }
    }

    async fn advance(&self, current: &ScriptedPage) -> Result<ScriptedPage, NavigationFault> {
        self.attempts.lock().push(Instant::now());
        if let Some(fault) = self.faults.lock().pop_front() {
            return Err(fault);
        }
        Ok(self
            .pages
            .get(current.number)
            .cloned()
            .unwrap_or_else(|| ScriptedPage::empty(current.number + 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_navigator_walks_pages() {
        let nav = ScriptedNavigator::new(vec![ScriptedPage::titled(1, &["a"]), ScriptedPage::titled(2, &["b"])]);
        let first = nav.first_page();
        assert_eq!(nav.has_next(&first).await, NextPage::Available);

        let second = nav.advance(&first).await.unwrap();
        assert_eq!(second.number, 2);
        assert_eq!(nav.has_next(&second).await, NextPage::Unknown);

        let third = nav.advance(&second).await.unwrap();
        assert!(third.items().await.is_empty());
        assert_eq!(nav.attempts(), 2);
    }

    #[tokio::test]
    async fn test_navigator_scripted_faults() {
        let nav = ScriptedNavigator::new(vec![ScriptedPage::titled(1, &["a"])])
            .failing(2, &NavigationFault::transient("slow"));
        let first = nav.first_page();
        assert!(nav.advance(&first).await.is_err());
        assert!(nav.advance(&first).await.is_err());
        assert!(nav.advance(&first).await.is_ok());
    }

    #[test]
    fn test_extractor_reads_declared_fields() {
        let extractor = ScriptedExtractor::new(&["title", "price"]);
        let result = extractor.extract(&ScriptedItem::titled("Dune")).unwrap();
        assert_eq!(result.get("title"), Some("Dune"));
        assert_eq!(result.absent(), vec!["price"]);

        assert!(extractor.extract(&ScriptedItem::failing("broken")).is_err());
        assert_eq!(extractor.calls(), 2);
    }
}
