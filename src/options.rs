use std::time::Duration;

use crate::WebClientError;

/// Which attempt failures are retried.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RetryOn {
    /// Every attempt failure, 4xx responses included.
    #[default]
    Any,
    /// Timeouts, transport failures and 5xx only. 4xx fails immediately.
    Transient,
}

impl RetryOn {
    pub fn should_retry(self, err: &WebClientError) -> bool {
        match self {
            Self::Any => err.is_attempt_failure(),
            Self::Transient => err.is_transient(),
        }
    }
}

/// Retry-with-backoff settings for the send/timeout/classify cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Delay before the first retry, in milliseconds. Doubles per retry.
    pub retry_backoff_ms: u64,
    /// Upper bound for a single backoff delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Random spread applied to each delay, as a fraction in `0.0..=1.0`.
    pub jitter: f64,
    /// Failures eligible for retry.
    pub retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_ms: 2_000,
            max_backoff_ms: u64::MAX,
            jitter: 0.5,
            retry_on: RetryOn::Any,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Exponential delay before retry number `attempt` (0-based), without
    /// jitter.
    pub fn base_delay(&self, attempt: usize) -> Duration {
        let exp = attempt.min(32) as u32;
        let multiplier = 1u64 << exp;
        let delay_ms = self
            .retry_backoff_ms
            .saturating_mul(multiplier)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay_ms)
    }

    /// Delay before retry number `attempt`, with jitter applied.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let base = self.base_delay(attempt);
        // Non-finite jitter (NaN, infinities) disables the spread.
        if !self.jitter.is_finite() {
            return base;
        }
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || base.is_zero() {
            return base;
        }
        // Uniform offset in [-jitter, +jitter] of the base delay.
        let offset = (fastrand::f64() * 2.0 - 1.0) * jitter;
        base.mul_f64(1.0 + offset)
    }
}

/// Configures the cycle timeout and retry behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout covering send and classification, in milliseconds.
    pub timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reads overrides from the environment, keeping defaults for unset
    /// variables.
    ///
    /// Reads:
    /// - `WEBCLIENT_TIMEOUT_MS`
    /// - `WEBCLIENT_MAX_RETRIES`
    /// - `WEBCLIENT_RETRY_BACKOFF_MS`
    /// - `WEBCLIENT_RETRY_ON` — `any` or `transient`
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> std::result::Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> std::result::Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(value) = lookup("WEBCLIENT_TIMEOUT_MS") {
            options.timeout_ms = parse_number("WEBCLIENT_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("WEBCLIENT_MAX_RETRIES") {
            options.retry.max_retries = parse_number("WEBCLIENT_MAX_RETRIES", &value)?;
        }
        if let Some(value) = lookup("WEBCLIENT_RETRY_BACKOFF_MS") {
            options.retry.retry_backoff_ms = parse_number("WEBCLIENT_RETRY_BACKOFF_MS", &value)?;
        }
        if let Some(value) = lookup("WEBCLIENT_RETRY_ON") {
            options.retry.retry_on = match value.trim().to_ascii_lowercase().as_str() {
                "any" => RetryOn::Any,
                "transient" => RetryOn::Transient,
                other => {
                    return Err(format!(
                        "WEBCLIENT_RETRY_ON must be 'any' or 'transient', got '{other}'"
                    ))
                }
            };
        }
        Ok(options)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> std::result::Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("{key} must be a non-negative integer, got '{value}'"))
}
