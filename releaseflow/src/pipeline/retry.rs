//! Stage retry policy.
//!
//! Retries are off by default; publishes and releases are not safe to
//! replay blindly. When enabled, only transport-level failures are
//! retried, with full-jitter exponential backoff.

use rand::Rng;
use std::time::Duration;

/// How many times a stage may be attempted and how long to back off
/// between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per stage, including the first.
    pub max_attempts: u32,

    /// Base delay before the second attempt.
    pub base_delay: Duration,

    /// Upper bound on any single backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

impl RetryPolicy {
    /// No retries: every stage gets exactly one attempt.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Retries transport failures up to `max_attempts` total attempts.
    #[must_use]
    pub fn network_only(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }

    /// The backoff before the given retry (1 = first retry), drawn
    /// uniformly from zero up to the exponential cap.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = retry.saturating_sub(1).min(16);
        let cap = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay);

        let millis = cap.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
    }
}
