//! Observability utilities.
//!
//! Library code only emits `tracing` events and [`CrawlEvent`](crate::events::CrawlEvent)s;
//! installing a subscriber is left to binaries.

mod subscriber;

pub use subscriber::{env_filter, init_tracing, LogFormat};
