//! Cooperative cancellation for long crawls.
//!
//! The engine checks the token at the top of every page and before every
//! backoff sleep; sleeps already in progress wake as soon as the token fires.

mod token;

pub use token::CancellationToken;
