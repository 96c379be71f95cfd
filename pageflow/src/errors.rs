//! Error types for the pageflow crawler.
//!
//! Faults are split by granularity: a field that cannot be located, an item
//! that cannot be extracted, a navigation attempt that failed, and invalid
//! configuration rejected before any page is fetched. Only configuration and
//! I/O-level failures surface as [`PageflowError`]; the crawl itself always
//! returns a (possibly partial) report.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T, E = PageflowError> = std::result::Result<T, E>;

/// The main error type for pageflow operations.
#[derive(Debug, Error)]
pub enum PageflowError {
    /// Invalid configuration.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A CSS selector failed to compile.
    #[error("{0}")]
    Selector(#[from] SelectorError),

    /// Fetching a page failed.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// Tabular export or import failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Export data did not match the declared shape.
    #[error("Export error: {0}")]
    Export(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid crawl bounds or malformed configuration.
///
/// Always raised before the first page is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid configuration for '{field}': {message}")]
pub struct ConfigurationError {
    /// The offending setting.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ConfigurationError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A CSS selector that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid CSS selector '{selector}': {message}")]
pub struct SelectorError {
    /// The selector text.
    pub selector: String,
    /// Parser message.
    pub message: String,
}

impl SelectorError {
    /// Creates a new selector error.
    #[must_use]
    pub fn new(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            message: message.into(),
        }
    }
}

/// One field could not be produced for one item.
///
/// Recovered locally: the field is recorded as absent and extraction of the
/// remaining fields continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldLookupFault {
    /// Nothing matched the field's locator, or the value was empty.
    #[error("field '{field}' not found")]
    NotFound {
        /// The field name.
        field: String,
    },

    /// A lookup table had no entry for the located token.
    #[error("field '{field}': unrecognized token '{token}'")]
    UnrecognizedToken {
        /// The field name.
        field: String,
        /// The token that was not in the table.
        token: String,
    },

    /// The located value could not be normalized.
    #[error("field '{field}': {message}")]
    Malformed {
        /// The field name.
        field: String,
        /// What went wrong.
        message: String,
    },
}

impl FieldLookupFault {
    /// Creates a not-found fault.
    #[must_use]
    pub fn not_found(field: impl Into<String>) -> Self {
        Self::NotFound { field: field.into() }
    }

    /// Creates an unrecognized-token fault.
    #[must_use]
    pub fn unrecognized(field: impl Into<String>, token: impl Into<String>) -> Self {
        Self::UnrecognizedToken {
            field: field.into(),
            token: token.into(),
        }
    }

    /// Creates a malformed-value fault.
    #[must_use]
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the name of the field this fault belongs to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::NotFound { field }
            | Self::UnrecognizedToken { field, .. }
            | Self::Malformed { field, .. } => field,
        }
    }
}

/// An item could not be extracted at all. The item is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("item extraction failed: {reason}")]
pub struct ItemExtractionFault {
    /// Why the item was skipped.
    pub reason: String,
}

impl ItemExtractionFault {
    /// Creates a new item fault.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Creates a fault for a required field that could not be located.
    #[must_use]
    pub fn missing_required(fault: &FieldLookupFault) -> Self {
        Self::new(format!("required {fault}"))
    }
}

/// Whether a fault is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Timing or rendering related; retry with backoff.
    Transient,
    /// Structural; retrying will not help.
    Permanent,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// A navigation attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Navigation failed ({kind}): {message}")]
pub struct NavigationFault {
    /// Transient or permanent.
    pub kind: FaultKind,
    /// Description of the failure.
    pub message: String,
}

impl NavigationFault {
    /// Creates a transient fault.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Transient,
            message: message.into(),
        }
    }

    /// Creates a permanent fault.
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Permanent,
            message: message.into(),
        }
    }

    /// Returns true if the fault should be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind == FaultKind::Transient
    }
}

/// Errors raised while fetching a page over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The URL could not be parsed or joined.
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// The request never produced a response (connect, DNS, timeout).
    #[error("Request to {url} failed: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Client message.
        message: String,
        /// Whether the failure was a timeout.
        timeout: bool,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code.
        status: u16,
        /// Whether the status is configured as transient.
        transient: bool,
    },

    /// The response body exceeded the configured size cap.
    #[error("Response from {url} exceeds {limit} bytes")]
    TooLarge {
        /// Requested URL.
        url: String,
        /// The configured cap.
        limit: usize,
    },
}

impl FetchError {
    /// Returns true if the failure is worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { transient, .. } => *transient,
            Self::InvalidUrl { .. } | Self::TooLarge { .. } => false,
        }
    }
}

impl From<FetchError> for NavigationFault {
    fn from(err: FetchError) -> Self {
        if err.is_transient() {
            Self::transient(err.to_string())
        } else {
            Self::permanent(err.to_string())
        }
    }
}
