//! Post-crawl analysis over extracted records.
//!
//! Numeric summaries, extremes and histograms for one field, plus
//! case-insensitive filtering and keyword search. Values that do not parse
//! as numbers are counted as missing.

mod query;
mod stats;

pub use query::{filter_by_value, search, value_counts};
pub use stats::{histogram, max_by_field, min_by_field, numeric_value, summarize, Bucket, NumericSummary};
