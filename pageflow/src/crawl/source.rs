//! Collaborator contracts: where items come from and how pages advance.

use async_trait::async_trait;

use crate::errors::NavigationFault;

/// The current page of a crawl.
///
/// A source is a snapshot: `items` must return the same items, in the same
/// order, every time it is called on the same value.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// The raw representation of one scraped entity.
    type Item: Send + Sync;

    /// Items on this page, in page order. An empty list ends the crawl.
    async fn items(&self) -> Vec<Self::Item>;

    /// Where the page came from, for events and logs.
    fn location(&self) -> Option<String> {
        None
    }
}

/// What a navigator knows about the page after the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPage {
    /// A next page exists.
    Available,
    /// The navigator cannot tell; try to advance.
    Unknown,
    /// A definitive terminal marker was found. No navigation is attempted.
    Terminal,
}

impl NextPage {
    /// Returns true if the engine should try to advance.
    #[must_use]
    pub const fn should_advance(self) -> bool {
        !matches!(self, Self::Terminal)
    }
}

/// Moves a crawl from one page to the next.
#[async_trait]
pub trait Navigator<S: PageSource>: Send + Sync {
    /// Reports whether a further page exists.
    async fn has_next(&self, current: &S) -> NextPage;

    /// Produces the next page. Transient faults are retried by the engine.
    async fn advance(&self, current: &S) -> Result<S, NavigationFault>;
}
