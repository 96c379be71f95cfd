//! Structured crawl events and the sinks that receive them.
//!
//! The engine never writes to the console or to files itself; every
//! observable step is reported as a [`CrawlEvent`] to an injected
//! [`EventSink`].

mod crawl_event;
mod sink;

pub use crawl_event::CrawlEvent;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
