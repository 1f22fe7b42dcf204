//! Coordinator configuration.

use std::str::FromStr;
use std::time::Duration;

use crate::backoff;

/// Retry policy for one `run_in_transaction` call.
///
/// Immutable; supplied per call or defaulted process-wide. Defaults: 8
/// attempts, 50ms base, 5000ms cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first (always ≥ 1).
    pub max_attempts: u32,
    /// Base delay the exponential window grows from.
    pub base_delay: Duration,
    /// Cap on the exponential window.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// A config that never retries (single attempt).
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Full-jitter delay before retrying `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        backoff::full_jitter(self.base_delay, self.max_delay, attempt)
    }

    /// Whether another attempt is allowed after `attempt` failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Process-wide coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Semaphore capacity: maximum concurrently running transactions.
    /// The sole backpressure mechanism against the storage engine.
    pub max_concurrent: usize,
    /// Default retry policy for calls that don't supply their own.
    pub retry: RetryConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 50,
            retry: RetryConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Load from the environment, falling back to the documented defaults.
    ///
    /// Variables: `TXNGATE_MAX_CONCURRENT`, `TXNGATE_MAX_ATTEMPTS`,
    /// `TXNGATE_BASE_DELAY_MS`, `TXNGATE_MAX_DELAY_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_concurrent = parse_or(
            "TXNGATE_MAX_CONCURRENT",
            std::env::var("TXNGATE_MAX_CONCURRENT").ok(),
            defaults.max_concurrent,
        );
        let max_attempts = parse_or(
            "TXNGATE_MAX_ATTEMPTS",
            std::env::var("TXNGATE_MAX_ATTEMPTS").ok(),
            defaults.retry.max_attempts,
        );
        let base_ms = parse_or(
            "TXNGATE_BASE_DELAY_MS",
            std::env::var("TXNGATE_BASE_DELAY_MS").ok(),
            defaults.retry.base_delay.as_millis() as u64,
        );
        let max_ms = parse_or(
            "TXNGATE_MAX_DELAY_MS",
            std::env::var("TXNGATE_MAX_DELAY_MS").ok(),
            defaults.retry.max_delay.as_millis() as u64,
        );

        Self {
            max_concurrent: max_concurrent.max(1),
            retry: RetryConfig::new(
                max_attempts,
                Duration::from_millis(base_ms),
                Duration::from_millis(max_ms),
            ),
        }
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Parse an env value, keeping the default (with a warning) on garbage.
fn parse_or<T: FromStr + Copy>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(s) => s.parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %s, "malformed value, using default");
            default
        }),
    }
}
