//! Typed events emitted by the crawl engine.

use serde::Serialize;

/// An observable step of a crawl.
///
/// Each variant maps to a dotted event type (see [`CrawlEvent::event_type`])
/// and serializes its fields as the event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CrawlEvent {
    /// The crawl began.
    Started {
        /// Run identifier.
        run_id: String,
        /// Page bound, 0 when unbounded.
        max_pages: usize,
        /// Navigation attempt bound.
        max_nav_retries: u32,
    },
    /// A page is about to be processed.
    PageStarted {
        /// 1-based page index.
        page: usize,
        /// Where the page came from, if the source knows.
        location: Option<String>,
    },
    /// An item produced a result.
    ItemExtracted {
        /// 1-based page index.
        page: usize,
        /// 0-based item position on the page.
        index: usize,
        /// Fields with a value.
        fields_present: Vec<String>,
        /// Fields recorded as absent.
        fields_absent: Vec<String>,
        /// Content fingerprint of the result.
        fingerprint: String,
    },
    /// An item could not be extracted and was dropped.
    ItemSkipped {
        /// 1-based page index.
        page: usize,
        /// 0-based item position on the page.
        index: usize,
        /// Why the item was skipped.
        reason: String,
    },
    /// Every item on the page was processed.
    PageCompleted {
        /// 1-based page index.
        page: usize,
        /// Results produced from this page.
        extracted: usize,
        /// Items skipped on this page.
        skipped: usize,
    },
    /// The page had no items; the source is exhausted.
    PageExhausted {
        /// 1-based page index.
        page: usize,
    },
    /// The navigator reported a definitive terminal marker.
    LastPage {
        /// 1-based page index.
        page: usize,
    },
    /// A navigation attempt is about to be retried after a wait.
    NavigationRetry {
        /// Page being navigated away from.
        page: usize,
        /// 1-based attempt about to run.
        attempt: u32,
        /// Wait in backoff units.
        wait_units: u64,
        /// Wait in milliseconds.
        wait_ms: u64,
        /// The fault from the previous attempt.
        error: String,
    },
    /// Every navigation attempt failed transiently.
    NavigationExhausted {
        /// Page being navigated away from.
        page: usize,
        /// Attempts made.
        attempts: u32,
    },
    /// A navigation attempt failed permanently.
    NavigationFailed {
        /// Page being navigated away from.
        page: usize,
        /// Attempt that failed.
        attempt: u32,
        /// The fault.
        error: String,
    },
    /// The crawl was cancelled by the caller.
    Cancelled {
        /// Page the crawl was on.
        page: usize,
        /// Cancellation reason, if given.
        reason: Option<String>,
    },
    /// The crawl finished.
    Completed {
        /// Run identifier.
        run_id: String,
        /// Pages whose items were processed.
        pages_visited: usize,
        /// Results collected.
        results: usize,
        /// Items skipped.
        skipped: usize,
        /// Why the crawl stopped.
        stop_reason: String,
    },
}

impl CrawlEvent {
    /// Returns the dotted event type.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "crawl.started",
            Self::PageStarted { .. } => "crawl.page_started",
            Self::ItemExtracted { .. } => "crawl.item_extracted",
            Self::ItemSkipped { .. } => "crawl.item_skipped",
            Self::PageCompleted { .. } => "crawl.page_completed",
            Self::PageExhausted { .. } => "crawl.page_exhausted",
            Self::LastPage { .. } => "crawl.last_page",
            Self::NavigationRetry { .. } => "crawl.navigation_retry",
            Self::NavigationExhausted { .. } => "crawl.navigation_exhausted",
            Self::NavigationFailed { .. } => "crawl.navigation_failed",
            Self::Cancelled { .. } => "crawl.cancelled",
            Self::Completed { .. } => "crawl.completed",
        }
    }

    /// Returns the event payload.
    #[must_use]
    pub fn data(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
