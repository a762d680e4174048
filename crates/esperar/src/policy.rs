//! Poll policies governing wait loops.

use crate::result::{EsperaError, EsperaResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (500ms)
pub const DEFAULT_INTERVAL_MS: u64 = 500;

/// Default number of whole-scan retries for indexed collection lookups
pub const DEFAULT_INDEX_SCAN_RETRIES: u32 = 10;

/// Timeout + interval pair governing a single wait loop.
///
/// Invariant: `interval_ms <= timeout_ms`, and both are non-zero. Enforced
/// by [`PollPolicy::new`]; the builder methods preserve it by construction
/// only when used sensibly, so [`PollPolicy::validate`] is re-checked at
/// the start of every wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Total budget for the wait in milliseconds
    pub timeout_ms: u64,
    /// Cadence between poll attempts in milliseconds
    pub interval_ms: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl PollPolicy {
    /// Create a policy, validating the invariant.
    ///
    /// # Errors
    ///
    /// Returns [`EsperaError::InvalidPolicy`] if either value is zero or the
    /// interval exceeds the timeout.
    pub fn new(timeout_ms: u64, interval_ms: u64) -> EsperaResult<Self> {
        let policy = Self {
            timeout_ms,
            interval_ms,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Create a policy with the given timeout and the default interval,
    /// clamping the interval down to the timeout for short budgets.
    #[must_use]
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            interval_ms: DEFAULT_INTERVAL_MS.min(timeout_ms),
        }
    }

    /// Override the interval
    #[must_use]
    pub const fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Check the policy invariant.
    ///
    /// # Errors
    ///
    /// Returns [`EsperaError::InvalidPolicy`] on violation.
    pub fn validate(&self) -> EsperaResult<()> {
        if self.timeout_ms == 0 || self.interval_ms == 0 || self.interval_ms > self.timeout_ms {
            return Err(EsperaError::InvalidPolicy {
                timeout_ms: self.timeout_ms,
                interval_ms: self.interval_ms,
            });
        }
        Ok(())
    }

    /// Timeout as a `Duration`
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Interval as a `Duration`
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Derive the policy for the remainder of a larger budget.
    ///
    /// Used by composite actions that restart an inner wait after a stale
    /// element: the inner wait gets whatever is left of the outer budget,
    /// with the interval clamped so the invariant still holds.
    #[must_use]
    pub fn remaining(&self, elapsed_ms: u64) -> Self {
        let timeout_ms = self.timeout_ms.saturating_sub(elapsed_ms).max(1);
        Self {
            timeout_ms,
            interval_ms: self.interval_ms.min(timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod invariant_tests {
        use super::*;

        #[test]
        fn test_valid_policy() {
            let policy = PollPolicy::new(5000, 250).unwrap();
            assert_eq!(policy.timeout_ms, 5000);
            assert_eq!(policy.interval_ms, 250);
        }

        #[test]
        fn test_interval_above_timeout_rejected() {
            let result = PollPolicy::new(100, 500);
            assert!(matches!(
                result,
                Err(crate::EsperaError::InvalidPolicy {
                    timeout_ms: 100,
                    interval_ms: 500
                })
            ));
        }

        #[test]
        fn test_zero_values_rejected() {
            assert!(PollPolicy::new(0, 0).is_err());
            assert!(PollPolicy::new(1000, 0).is_err());
            assert!(PollPolicy::new(0, 1000).is_err());
        }

        #[test]
        fn test_interval_equal_to_timeout_allowed() {
            assert!(PollPolicy::new(500, 500).is_ok());
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn test_default_policy_is_valid() {
            let policy = PollPolicy::default();
            assert!(policy.validate().is_ok());
            assert_eq!(policy.timeout_ms, DEFAULT_TIMEOUT_MS);
            assert_eq!(policy.interval_ms, DEFAULT_INTERVAL_MS);
        }

        #[test]
        fn test_with_timeout_clamps_interval() {
            let policy = PollPolicy::with_timeout(100);
            assert_eq!(policy.timeout_ms, 100);
            assert_eq!(policy.interval_ms, 100);
            assert!(policy.validate().is_ok());
        }

        #[test]
        fn test_with_interval() {
            let policy = PollPolicy::with_timeout(5000).with_interval(50);
            assert_eq!(policy.interval_ms, 50);
        }

        #[test]
        fn test_durations() {
            let policy = PollPolicy::new(2000, 100).unwrap();
            assert_eq!(policy.timeout(), Duration::from_millis(2000));
            assert_eq!(policy.interval(), Duration::from_millis(100));
        }
    }

    mod remaining_tests {
        use super::*;

        #[test]
        fn test_remaining_shrinks_timeout() {
            let policy = PollPolicy::new(5000, 500).unwrap();
            let rest = policy.remaining(4800);
            assert_eq!(rest.timeout_ms, 200);
            assert_eq!(rest.interval_ms, 200);
            assert!(rest.validate().is_ok());
        }

        #[test]
        fn test_remaining_never_hits_zero() {
            let policy = PollPolicy::new(5000, 500).unwrap();
            let rest = policy.remaining(9999);
            assert!(rest.validate().is_ok());
            assert_eq!(rest.timeout_ms, 1);
        }
    }
}
