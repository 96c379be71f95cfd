//! The paginated crawl engine.
//!
//! [`CrawlEngine`] consumes three collaborators: a [`PageSource`] exposing
//! the items of the current page, a [`Navigator`] that moves to the next
//! page, and a [`FieldExtractor`](crate::extract::FieldExtractor) that turns
//! each item into a record.

mod config;
mod engine;
mod report;
mod retry;
mod source;

pub use config::{CrawlConfig, SettleDelay, MAX_NAV_RETRIES_LIMIT};
pub use engine::{crawl, CrawlEngine};
pub use report::{CrawlReport, SkipRecord, StopReason};
pub use retry::{BackoffPolicy, RetryDecision, RetryState};
pub use source::{Navigator, NextPage, PageSource};
