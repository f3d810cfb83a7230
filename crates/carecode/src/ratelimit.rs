//! Failed-attempt limiter for the validation path.
//!
//! Validation is the one surface an untrusted caller can hammer, so failed
//! attempts are throttled per caller key over a sliding window. The limiter
//! is an explicitly constructed component owning its own state: it is built
//! once per process and handed to the validator, never reached through
//! module-level globals.
//!
//! A limited caller receives the same opaque failure as an invalid code, so
//! the limiter never becomes an oracle itself.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Configuration for the attempt limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    /// Whether limiting is enabled at all.
    pub enabled: bool,
    /// Failed attempts allowed per key within the window.
    pub max_failures: u32,
    /// Sliding-window length in seconds.
    pub window_secs: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_failures: 10,
            window_secs: 300,
        }
    }
}

/// Sliding-window failed-attempt limiter keyed by caller.
#[derive(Debug)]
pub struct AttemptLimiter {
    config: LimiterConfig,
    failures: HashMap<String, Vec<DateTime<Utc>>>,
}

impl AttemptLimiter {
    /// Create a limiter with the given configuration.
    #[must_use]
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            failures: HashMap::new(),
        }
    }

    /// The start of the current window.
    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::seconds(i64::try_from(self.config.window_secs).unwrap_or(i64::MAX))
    }

    /// Check whether the key has exhausted its failure budget.
    #[must_use]
    pub fn is_limited(&self, key: &str, now: DateTime<Utc>) -> bool {
        if !self.config.enabled {
            return false;
        }
        let window_start = self.window_start(now);
        let recent = self
            .failures
            .get(key)
            .map_or(0, |times| times.iter().filter(|t| **t >= window_start).count());
        recent >= self.config.max_failures as usize
    }

    /// Record a failed attempt for the key, pruning entries that have
    /// fallen out of the window.
    pub fn record_failure(&mut self, key: &str, now: DateTime<Utc>) {
        if !self.config.enabled {
            return;
        }
        let window_start = self.window_start(now);
        let times = self.failures.entry(key.to_string()).or_default();
        times.retain(|t| *t >= window_start);
        times.push(now);
        debug!(key = %key, failures = times.len(), "Recorded failed validation attempt");
    }

    /// Clear the failure history for a key after a successful validation.
    pub fn clear(&mut self, key: &str) {
        self.failures.remove(key);
    }
}
