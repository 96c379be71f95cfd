//! # Pageflow
//!
//! A crawl-and-extract engine for paginated listings.
//!
//! Pageflow walks a sequence of pages, pulls a fixed set of named fields out
//! of every item on each page and collects the results in order, with:
//!
//! - **Field-level fault tolerance**: a field that cannot be found is recorded as absent
//! - **Item-level fault tolerance**: an item that cannot be extracted is skipped, not fatal
//! - **Retrying navigation**: transient navigation failures back off exponentially
//! - **Observability**: every page, item and retry is reported to an [`EventSink`](events::EventSink)
//! - **Cancellation**: a shared token stops the crawl between pages or mid-backoff
//! - **Analysis**: numeric summaries, histograms, filtering and keyword search over results
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pageflow::prelude::*;
//!
//! let profile = ScrapeProfile::from_file("books.json")?;
//! let report = profile.run().await?;
//! println!("{} items from {} pages", report.results.len(), report.pages_visited);
//! ```
//!
//! Custom sources plug in through [`PageSource`](crawl::PageSource),
//! [`Navigator`](crawl::Navigator) and [`FieldExtractor`](extract::FieldExtractor).

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod analysis;
pub mod cancellation;
pub mod crawl;
pub mod errors;
pub mod events;
pub mod export;
pub mod extract;
pub mod observability;
pub mod testing;

#[cfg(feature = "web")]
pub mod web;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analysis::{filter_by_value, histogram, search, summarize, NumericSummary};
    pub use crate::cancellation::CancellationToken;
    pub use crate::crawl::{
        crawl, CrawlConfig, CrawlEngine, CrawlReport, Navigator, NextPage, PageSource,
        StopReason,
    };
    pub use crate::errors::{
        ConfigurationError, FieldLookupFault, ItemExtractionFault, NavigationFault,
        PageflowError,
    };
    pub use crate::events::{
        CollectingEventSink, CrawlEvent, EventSink, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::extract::{
        ExtractionResult, ExtractorSpec, FieldExtractor, FieldSpec, LookupExtractor,
        Normalizer, ValueSource,
    };

    #[cfg(feature = "web")]
    pub use crate::extract::{HtmlItem, SelectorExtractor};
    #[cfg(feature = "web")]
    pub use crate::web::{download_assets, FetchConfig, Fetcher, HttpFetcher, PaginationSpec, ScrapeProfile};
}
