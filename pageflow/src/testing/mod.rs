//! Testing utilities for pageflow crawls.
//!
//! This module provides:
//! - Scripted pages, items, navigators and extractors for engine tests
//! - An in-memory fetcher for the web adapters

#[cfg(feature = "web")]
mod fetcher;
mod scripted;

#[cfg(feature = "web")]
pub use fetcher::InMemoryFetcher;
pub use scripted::{ScriptedExtractor, ScriptedItem, ScriptedNavigator, ScriptedPage};
