use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use crate::{AttemptFailure, Method};

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay of the exponential backoff.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);
/// Default cap on retries caused by failures without any response.
pub const DEFAULT_NO_RESPONSE_RETRIES: u32 = 2;
/// Methods that are safe to repeat without extra side effects.
pub const DEFAULT_HTTP_METHODS_TO_RETRY: [Method; 5] = [
    Method::Get,
    Method::Put,
    Method::Head,
    Method::Options,
    Method::Delete,
];
/// Informational, throttling and server error statuses.
pub const DEFAULT_STATUS_CODES_TO_RETRY: [RangeInclusive<u16>; 3] = [100..=199, 429..=429, 500..=599];

/// Boxed error returned by retry observers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Caller-supplied predicate that decides retry eligibility.
pub type ShouldRetryFn = Arc<dyn Fn(&AttemptFailure) -> bool + Send + Sync>;

/// Caller-supplied observer notified before each retried attempt.
pub type OnRetryAttemptFn =
    Arc<dyn Fn(&AttemptFailure) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Retry behavior of one logical request.
///
/// The counters (`current_retry_attempt`, `no_response_attempt`) belong to the
/// running request and are advanced by [`crate::should_retry`]; callers normally
/// leave them at zero.
#[derive(Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Number of retries already attempted.
    pub current_retry_attempt: u32,
    /// Base delay; the n-th retry waits `retry_delay * 2^n`.
    pub retry_delay: Duration,
    /// Methods retried automatically when the server answers with an error.
    pub http_methods_to_retry: Vec<Method>,
    /// Inclusive status ranges that qualify for a retry.
    pub status_codes_to_retry: Vec<RangeInclusive<u16>>,
    /// Maximum number of retries caused by failures without a response.
    pub no_response_retries: u32,
    /// Number of retries already spent on failures without a response.
    pub no_response_attempt: u32,
    /// Overrides the status-based eligibility check.
    pub should_retry: Option<ShouldRetryFn>,
    /// Notified whenever a retry is scheduled. Cannot veto the retry.
    pub on_retry_attempt: Option<OnRetryAttemptFn>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            current_retry_attempt: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
            http_methods_to_retry: DEFAULT_HTTP_METHODS_TO_RETRY.to_vec(),
            status_codes_to_retry: DEFAULT_STATUS_CODES_TO_RETRY.to_vec(),
            no_response_retries: DEFAULT_NO_RESPONSE_RETRIES,
            no_response_attempt: 0,
            should_retry: None,
            on_retry_attempt: None,
        }
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_retries", &self.max_retries)
            .field("current_retry_attempt", &self.current_retry_attempt)
            .field("retry_delay", &self.retry_delay)
            .field("http_methods_to_retry", &self.http_methods_to_retry)
            .field("status_codes_to_retry", &self.status_codes_to_retry)
            .field("no_response_retries", &self.no_response_retries)
            .field("no_response_attempt", &self.no_response_attempt)
            .field("should_retry", &self.should_retry.as_ref().map(|_| "<fn>"))
            .field(
                "on_retry_attempt",
                &self.on_retry_attempt.as_ref().map(|_| "<fn>"),
            )
            .finish()
    }
}

impl RetryConfig {
    /// Sets the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base backoff delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Replaces the set of methods eligible for automatic retry.
    pub fn with_http_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.http_methods_to_retry = methods.into_iter().collect();
        self
    }

    /// Replaces the retryable status ranges.
    pub fn with_status_codes<I>(mut self, ranges: I) -> Self
    where
        I: IntoIterator<Item = RangeInclusive<u16>>,
    {
        self.status_codes_to_retry = ranges.into_iter().collect();
        self
    }

    /// Sets the cap on retries caused by failures without a response.
    pub fn with_no_response_retries(mut self, retries: u32) -> Self {
        self.no_response_retries = retries;
        self
    }

    /// Installs a predicate that overrides the status-based check.
    pub fn with_should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&AttemptFailure) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    /// Installs an observer notified before each retry.
    ///
    /// Errors and panics raised by the observer are logged and ignored; they
    /// never change the retry decision.
    pub fn with_on_retry_attempt<F>(mut self, observer: F) -> Self
    where
        F: Fn(&AttemptFailure) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_retry_attempt = Some(Arc::new(observer));
        self
    }

    /// Whether `method` may be repeated automatically.
    pub fn is_method_retryable(&self, method: Method) -> bool {
        self.http_methods_to_retry.contains(&method)
    }

    /// Whether `status` falls within any configured range.
    pub fn is_status_retryable(&self, status: u16) -> bool {
        self.status_codes_to_retry
            .iter()
            .any(|range| range.contains(&status))
    }

    /// Backoff to wait before retry number `attempt` (zero-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.min(31);
        self.retry_delay.saturating_mul(1u32 << exp)
    }
}
