use std::time::Duration;

use crate::{Headers, RetryConfig};

/// Process-wide request defaults, injected into every request at entry.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Per-attempt timeout used when a request does not set one.
    pub timeout: Duration,
    /// Retry configuration used when a request does not carry its own.
    pub retry: RetryConfig,
    /// Headers sent with every request; per-request headers take precedence.
    pub headers: Headers,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            retry: RetryConfig::default(),
            headers: Headers::new(),
        }
    }
}

impl ClientOptions {
    /// Reads overrides from environment variables.
    ///
    /// Reads (all optional, defaults otherwise):
    /// - `CROSSFETCH_TIMEOUT_MS` — per-attempt timeout
    /// - `CROSSFETCH_MAX_RETRIES` — maximum retries after the first attempt
    /// - `CROSSFETCH_RETRY_DELAY_MS` — base backoff delay
    /// - `CROSSFETCH_NO_RESPONSE_RETRIES` — retries for failures without a response
    ///
    /// Returns an error if a variable is set but not a non-negative integer.
    ///
    /// **Not available on `wasm32` targets** — environment variables do not
    /// exist in browser runtimes.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> std::result::Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    pub(crate) fn from_lookup<F>(lookup: F) -> std::result::Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| -> std::result::Result<Option<u64>, String> {
            match lookup(name) {
                None => Ok(None),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| format!("{name} must be a non-negative integer, got '{raw}'")),
            }
        };
        let read_u32 = |name: &str| -> std::result::Result<Option<u32>, String> {
            read(name)?
                .map(|value| u32::try_from(value).map_err(|_| format!("{name} is out of range")))
                .transpose()
        };

        let mut options = Self::default();
        if let Some(ms) = read("CROSSFETCH_TIMEOUT_MS")? {
            options.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = read("CROSSFETCH_RETRY_DELAY_MS")? {
            options.retry.retry_delay = Duration::from_millis(ms);
        }
        if let Some(retries) = read_u32("CROSSFETCH_MAX_RETRIES")? {
            options.retry.max_retries = retries;
        }
        if let Some(retries) = read_u32("CROSSFETCH_NO_RESPONSE_RETRIES")? {
            options.retry.no_response_retries = retries;
        }
        Ok(options)
    }
}
