use std::time::Duration;

use rand::Rng;

use serde::Deserialize;

use crate::config::millis;

// Default delay before the first retry.
const INITIAL_DELAY: Duration = Duration::from_millis(500);

// Default upper bound of a retry delay.
const MAX_DELAY: Duration = Duration::from_secs(30);

// Default growth factor between two consecutive retries.
const MULTIPLIER: u32 = 2;

/// The reconnection backoff policy.
///
/// The delay before the `n`-th retry is `initial * multiplier^n`, capped at
/// `max`, then uniformly jittered within its upper half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    #[serde(with = "millis")]
    initial: Duration,
    #[serde(with = "millis")]
    max: Duration,
    multiplier: u32,
    max_attempts: Option<u32>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl BackoffConfig {
    /// Creates a [`BackoffConfig`] retrying forever with the default delays.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initial: INITIAL_DELAY,
            max: MAX_DELAY,
            multiplier: MULTIPLIER,
            max_attempts: None,
        }
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub const fn initial(mut self, initial: Duration) -> Self {
        self.initial = initial;
        self
    }

    /// Sets the upper bound of a retry delay.
    #[must_use]
    pub const fn max(mut self, max: Duration) -> Self {
        self.max = max;
        self
    }

    /// Sets the growth factor between two consecutive retries.
    ///
    /// A factor of `0` is treated as `1`.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Limits the number of consecutive retries.
    #[must_use]
    pub const fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Returns the delay bound before the retry number `attempt`,
    /// counting from `0`, without any jitter.
    #[must_use]
    pub fn delay_bound(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

// The state of a sequence of consecutive retries.
#[derive(Debug)]
pub(crate) struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub(crate) const fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    // Returns the delay to wait before the next retry, or `None` when no
    // retries are left.
    pub(crate) fn next_delay(&mut self) -> Option<Duration> {
        if self
            .config
            .max_attempts
            .is_some_and(|max_attempts| self.attempt >= max_attempts)
        {
            return None;
        }

        let bound = self.config.delay_bound(self.attempt);
        self.attempt = self.attempt.saturating_add(1);

        Some(jitter(bound, &mut rand::rng()))
    }

    pub(crate) const fn reset(&mut self) {
        self.attempt = 0;
    }

    pub(crate) const fn attempts(&self) -> u32 {
        self.attempt
    }
}

// Picks a delay uniformly in `[bound / 2, bound]`.
fn jitter(bound: Duration, rng: &mut impl Rng) -> Duration {
    let upper = u64::try_from(bound.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rng.random_range(upper / 2..=upper))
}
