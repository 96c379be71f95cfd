//! Navigation retry policy with exponential backoff.
//!
//! The first attempt runs immediately. Every failed attempt `k` is followed
//! by a wait of `2^(k-1)` units before attempt `k + 1`, so four failures
//! before a fifth, successful attempt cost `1 + 2 + 4 + 8 = 15` units. No
//! wait follows the final attempt.

use std::time::Duration;

use super::config::CrawlConfig;

/// Backoff schedule for navigation attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Length of one unit.
    pub unit: Duration,
    /// Cap on a single wait.
    pub max_delay: Option<Duration>,
}

impl BackoffPolicy {
    /// Creates a policy with no cap.
    #[must_use]
    pub const fn new(max_attempts: u32, unit: Duration) -> Self {
        Self {
            max_attempts,
            unit,
            max_delay: None,
        }
    }

    /// Builds the policy described by a crawl config.
    #[must_use]
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            max_attempts: config.max_nav_retries,
            unit: config.backoff_unit(),
            max_delay: config.max_backoff_ms.map(Duration::from_millis),
        }
    }

    /// Units to wait before `attempt` (1-based). Attempt 1 waits nothing.
    #[must_use]
    pub const fn units_before(attempt: u32) -> u64 {
        if attempt <= 1 {
            0
        } else if attempt - 2 >= 63 {
            1u64 << 63
        } else {
            1u64 << (attempt - 2)
        }
    }

    /// Wait before `attempt`, honoring the cap.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let units = u32::try_from(Self::units_before(attempt)).unwrap_or(u32::MAX);
        let delay = self.unit.checked_mul(units).unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Total wait if the first `failures` attempts fail and the next succeeds.
    #[must_use]
    pub fn cumulative_delay(&self, failures: u32) -> Duration {
        (2..=failures + 1)
            .map(|attempt| self.delay_before(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// Attempt about to run.
        attempt: u32,
        /// Wait before it.
        delay: Duration,
        /// Wait in units.
        units: u64,
    },
    /// Every attempt has been used.
    GiveUp,
    /// The fault is not retryable.
    NotRetryable,
}

/// Attempt counter for one page transition.
///
/// Reset on every successful navigation.
#[derive(Debug, Default, Clone)]
pub struct RetryState {
    /// Attempts made so far.
    pub attempts: u32,
    /// Retries across the whole crawl.
    pub total_retries: u32,
}

impl RetryState {
    /// Creates a new retry state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an attempt and returns its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Decides what to do after the current attempt failed.
    pub fn after_failure(&mut self, policy: &BackoffPolicy, transient: bool) -> RetryDecision {
        if !transient {
            return RetryDecision::NotRetryable;
        }
        if self.attempts >= policy.max_attempts {
            return RetryDecision::GiveUp;
        }
        self.total_retries += 1;
        let next = self.attempts + 1;
        RetryDecision::Retry {
            attempt: next,
            delay: policy.delay_before(next),
            units: BackoffPolicy::units_before(next),
        }
    }

    /// Resets the per-transition counter.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_before() {
        assert_eq!(BackoffPolicy::units_before(1), 0);
        assert_eq!(BackoffPolicy::units_before(2), 1);
        assert_eq!(BackoffPolicy::units_before(3), 2);
        assert_eq!(BackoffPolicy::units_before(4), 4);
        assert_eq!(BackoffPolicy::units_before(5), 8);
    }

    #[test]
    fn test_cumulative_delay_for_four_failures() {
        let policy = BackoffPolicy::new(5, Duration::from_secs(1));
        assert_eq!(policy.cumulative_delay(4), Duration::from_secs(15));
        assert_eq!(policy.cumulative_delay(0), Duration::ZERO);
    }

    #[test]
    fn test_delay_cap() {
        let mut policy = BackoffPolicy::new(10, Duration::from_millis(100));
        policy.max_delay = Some(Duration::from_millis(250));
        assert_eq!(policy.delay_before(3), Duration::from_millis(200));
        assert_eq!(policy.delay_before(4), Duration::from_millis(250));
    }

    #[test]
    fn test_delay_does_not_overflow() {
        let policy = BackoffPolicy::new(32, Duration::from_secs(3600));
        assert_eq!(policy.delay_before(32), Duration::from_secs(3600 << 30));

        let huge = BackoffPolicy::new(5, Duration::MAX);
        assert_eq!(huge.delay_before(3), Duration::MAX);
        assert_eq!(huge.cumulative_delay(4), Duration::MAX);
    }

    #[test]
    fn test_state_gives_up_after_max_attempts() {
        let policy = BackoffPolicy::new(3, Duration::from_millis(10));
        let mut state = RetryState::new();

        assert_eq!(state.begin_attempt(), 1);
        assert_eq!(
            state.after_failure(&policy, true),
            RetryDecision::Retry {
                attempt: 2,
                delay: Duration::from_millis(10),
                units: 1
            }
        );
        state.begin_attempt();
        assert!(matches!(state.after_failure(&policy, true), RetryDecision::Retry { attempt: 3, units: 2, .. }));
        state.begin_attempt();
        assert_eq!(state.after_failure(&policy, true), RetryDecision::GiveUp);
        assert_eq!(state.total_retries, 2);

        state.reset();
        assert_eq!(state.attempts, 0);
        assert_eq!(state.total_retries, 2);
    }

    #[test]
    fn test_permanent_fault_not_retryable() {
        let policy = BackoffPolicy::new(5, Duration::from_millis(10));
        let mut state = RetryState::new();
        state.begin_attempt();
        assert_eq!(state.after_failure(&policy, false), RetryDecision::NotRetryable);
        assert_eq!(state.total_retries, 0);
    }
}
