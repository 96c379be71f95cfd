//! Aggregated outcome of a crawl.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::extract::ExtractionResult;

/// Why a crawl stopped. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// A page had no items.
    SourceExhausted,
    /// The navigator found a terminal marker.
    LastPage,
    /// The configured page bound was reached.
    PageLimitReached,
    /// Every navigation attempt failed transiently.
    NavigationExhausted {
        /// Attempts made.
        attempts: u32,
    },
    /// A navigation attempt failed permanently.
    NavigationFailed {
        /// The fault message.
        message: String,
    },
    /// The caller cancelled the crawl.
    Cancelled {
        /// Cancellation reason, if given.
        reason: Option<String>,
    },
}

impl StopReason {
    /// Short machine-readable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SourceExhausted => "source_exhausted",
            Self::LastPage => "last_page",
            Self::PageLimitReached => "page_limit_reached",
            Self::NavigationExhausted { .. } => "navigation_exhausted",
            Self::NavigationFailed { .. } => "navigation_failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Returns true if the crawl ran to a natural end.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::SourceExhausted | Self::LastPage | Self::PageLimitReached)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item that produced no result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipRecord {
    /// 1-based page index.
    pub page: usize,
    /// 0-based item position on the page.
    pub index: usize,
    /// Why the item was skipped.
    pub reason: String,
    /// When it was skipped.
    pub timestamp: DateTime<Utc>,
}

impl SkipRecord {
    /// Creates a record stamped now.
    #[must_use]
    pub fn new(page: usize, index: usize, reason: impl Into<String>) -> Self {
        Self {
            page,
            index,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Everything a crawl produced.
///
/// `results` keeps page order and, within a page, item order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    /// Run identifier.
    pub run_id: String,
    /// Extracted records.
    pub results: Vec<ExtractionResult>,
    /// Pages whose items were processed.
    pub pages_visited: usize,
    /// Items handed to the extractor.
    pub items_seen: usize,
    /// Items that produced no result.
    pub skipped: Vec<SkipRecord>,
    /// Navigation retries across the crawl.
    pub navigation_retries: u32,
    /// Why the crawl stopped.
    pub stop_reason: StopReason,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time.
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    /// Fraction of seen items that produced a result.
    #[must_use]
    pub fn yield_rate(&self) -> f64 {
        if self.items_seen == 0 {
            return 0.0;
        }
        self.results.len() as f64 / self.items_seen as f64
    }

    /// Wall-clock duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Returns true if any item was skipped.
    #[must_use]
    pub fn has_skips(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// Report without the records, as JSON.
    #[must_use]
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id,
            "pages_visited": self.pages_visited,
            "items_seen": self.items_seen,
            "results": self.results.len(),
            "skipped": self.skipped.len(),
            "yield_rate": self.yield_rate(),
            "navigation_retries": self.navigation_retries,
            "stop_reason": self.stop_reason,
            "started_at": self.started_at.to_rfc3339(),
            "finished_at": self.finished_at.to_rfc3339(),
            "duration_ms": self.duration_ms(),
        })
    }

    /// Consumes the report, keeping only the records.
    #[must_use]
    pub fn into_results(self) -> Vec<ExtractionResult> {
        self.results
    }
}
