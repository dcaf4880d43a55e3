//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Delay before the first reconnect attempt, doubled on every further attempt.
pub const BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default ceiling for a single reconnect delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Default upper bound (exclusive) of the random jitter.
pub const DEFAULT_JITTER: Duration = Duration::from_millis(1000);

/// Reconnect delay policy: `min(min(base * 2^(attempt-1), max) + jitter, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    jitter: Duration,
}

impl Backoff {
    /// Create a policy with the standard one second base.
    pub fn new(max: Duration, jitter: Duration) -> Self {
        Self {
            base: BASE_DELAY,
            max,
            jitter,
        }
    }

    /// Exponential delay for `attempt` (1-based) before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponential_base = 2u64.saturating_pow(attempt - 1);
        let delay_ms = millis(self.base).saturating_mul(exponential_base);
        Duration::from_millis(delay_ms.min(millis(self.max)))
    }

    /// Delay for `attempt` with an explicit jitter, clamped to the ceiling.
    pub fn delay_with(&self, attempt: u32, jitter: Duration) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        (self.base_delay(attempt) + jitter).min(self.max)
    }

    /// Delay for `attempt` with a uniformly random jitter in `[0, jitter)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter_range = millis(self.jitter);
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        self.delay_with(attempt, Duration::from_millis(jitter))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELAY, DEFAULT_JITTER)
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
