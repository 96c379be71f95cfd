//! Crawl bounds and pacing.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ConfigurationError;

/// Largest accepted navigation attempt bound.
pub const MAX_NAV_RETRIES_LIMIT: u32 = 32;

/// Settings for one crawl run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Maximum pages to process; 0 crawls until the source is exhausted.
    #[serde(default)]
    pub max_pages: usize,
    /// Maximum navigation attempts per page transition.
    #[serde(default = "default_max_nav_retries")]
    pub max_nav_retries: u32,
    /// Length of one backoff unit in milliseconds.
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
    /// Cap on a single backoff wait in milliseconds.
    #[serde(default)]
    pub max_backoff_ms: Option<u64>,
    /// Random pause after each successful navigation.
    #[serde(default)]
    pub settle_delay: Option<SettleDelay>,
}

fn default_max_nav_retries() -> u32 {
    5
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 0,
            max_nav_retries: default_max_nav_retries(),
            backoff_unit_ms: default_backoff_unit_ms(),
            max_backoff_ms: None,
            settle_delay: None,
        }
    }
}

impl CrawlConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a config from JSON and validates it.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigurationError::new("crawl", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the page bound.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets the navigation attempt bound.
    #[must_use]
    pub fn with_max_nav_retries(mut self, attempts: u32) -> Self {
        self.max_nav_retries = attempts;
        self
    }

    /// Sets the backoff unit.
    #[must_use]
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit_ms = duration_ms(unit);
        self
    }

    /// Caps each backoff wait.
    #[must_use]
    pub fn with_max_backoff(mut self, cap: Duration) -> Self {
        self.max_backoff_ms = Some(duration_ms(cap));
        self
    }

    /// Sets the settle delay range.
    #[must_use]
    pub fn with_settle_delay(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.settle_delay = Some(SettleDelay { min_ms, max_ms });
        self
    }

    /// The page bound, or `None` when unbounded.
    #[must_use]
    pub const fn page_limit(&self) -> Option<usize> {
        if self.max_pages == 0 {
            None
        } else {
            Some(self.max_pages)
        }
    }

    /// The backoff unit as a duration.
    #[must_use]
    pub const fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    /// Rejects bounds the engine cannot honor.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_nav_retries == 0 {
            return Err(ConfigurationError::new("max_nav_retries", "must be at least 1"));
        }
        if self.max_nav_retries > MAX_NAV_RETRIES_LIMIT {
            return Err(ConfigurationError::new(
                "max_nav_retries",
                format!("must be at most {MAX_NAV_RETRIES_LIMIT}"),
            ));
        }
        if let Some(settle) = &self.settle_delay {
            if settle.min_ms > settle.max_ms {
                return Err(ConfigurationError::new(
                    "settle_delay",
                    format!("min_ms {} exceeds max_ms {}", settle.min_ms, settle.max_ms),
                ));
            }
        }
        Ok(())
    }
}

/// Inclusive range of a politeness pause, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleDelay {
    /// Shortest pause.
    pub min_ms: u64,
    /// Longest pause.
    pub max_ms: u64,
}

impl SettleDelay {
    /// Picks a pause uniformly from the range.
    #[must_use]
    pub fn sample(&self) -> Duration {
        use rand::Rng;
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CrawlConfig::default();
        assert_eq!(config.max_pages, 0);
        assert_eq!(config.max_nav_retries, 5);
        assert_eq!(config.backoff_unit(), Duration::from_secs(1));
        assert_eq!(config.page_limit(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CrawlConfig::new()
            .with_max_pages(6)
            .with_max_nav_retries(3)
            .with_backoff_unit(Duration::from_millis(250))
            .with_max_backoff(Duration::from_secs(2))
            .with_settle_delay(100, 300);

        assert_eq!(config.page_limit(), Some(6));
        assert_eq!(config.backoff_unit_ms, 250);
        assert_eq!(config.max_backoff_ms, Some(2000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_oversized_durations_saturate() {
        let config = CrawlConfig::new()
            .with_backoff_unit(Duration::MAX)
            .with_max_backoff(Duration::MAX);
        assert_eq!(config.backoff_unit_ms, u64::MAX);
        assert_eq!(config.max_backoff_ms, Some(u64::MAX));
    }

    #[test]
    fn test_rejects_bad_bounds() {
        let zero = CrawlConfig::new().with_max_nav_retries(0);
        assert_eq!(zero.validate().unwrap_err().field, "max_nav_retries");

        let huge = CrawlConfig::new().with_max_nav_retries(33);
        assert!(huge.validate().is_err());

        let inverted = CrawlConfig::new().with_settle_delay(500, 100);
        assert_eq!(inverted.validate().unwrap_err().field, "settle_delay");
    }

    #[test]
    fn test_from_json_rejects_negative_retries() {
        let err = CrawlConfig::from_json(r#"{"max_nav_retries": -1}"#).unwrap_err();
        assert_eq!(err.field, "crawl");

        let config = CrawlConfig::from_json(r#"{"max_pages": 6}"#).unwrap();
        assert_eq!(config.max_pages, 6);
        assert_eq!(config.max_nav_retries, 5);
    }

    #[test]
    fn test_settle_sample_in_range() {
        let settle = SettleDelay { min_ms: 10, max_ms: 20 };
        for _ in 0..50 {
            let pause = settle.sample();
            assert!(pause >= Duration::from_millis(10) && pause <= Duration::from_millis(20));
        }
        assert_eq!(SettleDelay { min_ms: 5, max_ms: 5 }.sample(), Duration::from_millis(5));
    }
}
