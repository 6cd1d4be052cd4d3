//! Retry policy for optimistic-concurrency conflicts.

use rand::Rng;
use std::time::Duration;

/// Attempts a transfer gets before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Backoff before retry `n` is drawn from `[0, BACKOFF_SPREAD * n)` units
const BACKOFF_SPREAD: u32 = 10;

/// How often and how patiently a conflicted transfer is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Duration::from_millis(1))
    }
}

impl RetryPolicy {
    /// At least one attempt is always made
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    /// Retry without sleeping between attempts
    pub fn without_delay(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    /// Exclusive upper bound of the backoff after attempt `attempt` (1-based)
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .saturating_mul(BACKOFF_SPREAD.saturating_mul(attempt))
    }

    /// Randomized backoff after attempt `attempt` (1-based)
    pub fn backoff<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let spread = BACKOFF_SPREAD.saturating_mul(attempt);
        if spread == 0 || self.backoff_unit.is_zero() {
            return Duration::ZERO;
        }
        self.backoff_unit.saturating_mul(rng.gen_range(0..spread))
    }
}
