//! Retry policy: attempt budget and backoff delays for retryable failures.

use std::time::Duration;

/// Retry policy for retryable dispatch failures.
///
/// delay = min(base_delay * multiplier^(attempts - 1), max_delay)
///
/// Example with the defaults (base 2s, multiplier 2.0, cap 60s, 5 attempts):
/// - after attempt 1: 2s
/// - after attempt 2: 4s
/// - after attempt 3: 8s
/// - after attempt 4: 16s
/// - attempt 5 fails: the action is quarantined, no delay
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts allowed before a retryable failure is quarantined.
    pub max_attempts: u32,

    /// Delay after the first failed attempt.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// No delay between retries. Useful in tests and for dispatchers that do
    /// their own pacing.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Is another attempt allowed after `attempts` have been made?
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Delay before the next attempt, given `attempts` already made (1-indexed).
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let cap = self.max_delay.as_secs_f64();
        if !delay_secs.is_finite() || delay_secs >= cap {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs.max(0.0))
    }
}
