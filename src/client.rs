use std::fmt;

use reqwest::header::{HeaderName, HeaderValue};

use crate::{
    policy::{should_retry, RetryDecision},
    signal::abortable,
    timer, AttemptFailure, ClientOptions, Error, FailureOutcome, RequestConfig, Response, Result,
    ReqwestTransport, Transport, TransportError,
};

/// Sends a request with a default [`Client`].
///
/// # Example
///
/// ```no_run
/// # async fn run() -> crossfetch::Result<()> {
/// let response = crossfetch::request(crossfetch::RequestConfig::get("https://example.com/")).await?;
/// println!("{}", response.status);
/// # Ok(())
/// # }
/// ```
pub async fn request(config: RequestConfig) -> Result<Response> {
    Client::new().request(config).await
}

#[derive(Clone)]
/// HTTP client that retries failed attempts according to each request's
/// [`crate::RetryConfig`].
pub struct Client<T = ReqwestTransport> {
    transport: T,
    options: ClientOptions,
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Client<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl Client<ReqwestTransport> {
    /// Creates a client backed by [`ReqwestTransport`].
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::new())
    }

    /// Creates a client using options read from the environment.
    ///
    /// See [`ClientOptions::from_env`] for the variables consulted.
    ///
    /// **Not available on `wasm32` targets.**
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> std::result::Result<Self, String> {
        Ok(Self::new().with_options(ClientOptions::from_env()?))
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client on top of a custom transport.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            options: ClientOptions::default(),
        }
    }

    /// Applies client options such as timeout and retry defaults.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs one logical request to completion.
    ///
    /// Failed attempts are retried as decided by [`crate::should_retry`], with
    /// a non-blocking backoff between attempts. Only the final outcome is
    /// returned; intermediate failures are visible solely through the
    /// `on_retry_attempt` observer.
    pub async fn request(&self, config: RequestConfig) -> Result<Response> {
        let mut config = self.prepare(config)?;
        let mut attempts = 0u32;

        loop {
            if config.is_cancelled() {
                return Err(Error::Cancelled { attempts });
            }

            attempts += 1;

            #[cfg(feature = "tracing")]
            tracing::debug!("{} {} (attempt {})", config.method, config.url, attempts);

            let outcome = match self.transport.attempt(&config).await {
                Ok(response) if config.is_status_valid(response.status) => return Ok(response),
                Err(TransportError::Aborted) => return Err(Error::Cancelled { attempts }),
                Ok(response) => FailureOutcome::Response(response),
                Err(err) => FailureOutcome::NoResponse(err),
            };
            if config.is_cancelled() {
                return Err(Error::Cancelled { attempts });
            }
            let failure = AttemptFailure { outcome, config };

            match should_retry(&failure) {
                RetryDecision::Retry { delay, config: next } => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        "retrying {} {} after {} ms",
                        next.method,
                        next.url,
                        delay.as_millis()
                    );

                    if abortable(next.signal.as_ref(), timer::sleep(delay))
                        .await
                        .is_err()
                    {
                        return Err(Error::Cancelled { attempts });
                    }
                    config = next;
                }
                RetryDecision::Stop(_reason) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        "giving up on {} {} after {} attempt(s): {:?}",
                        failure.config.method,
                        failure.config.url,
                        attempts,
                        _reason
                    );

                    return Err(failure.into_error(attempts));
                }
            }
        }
    }

    /// Validates the URL and headers, and merges client defaults into
    /// `config`, once.
    fn prepare(&self, mut config: RequestConfig) -> Result<RequestConfig> {
        if let Err(err) = reqwest::Url::parse(&config.url) {
            return Err(Error::InvalidUrl {
                url: config.url,
                reason: err.to_string(),
            });
        }

        if config.timeout.is_none() {
            config.timeout = Some(self.options.timeout);
        }
        if config.retry_config.is_none() {
            config.retry_config = Some(self.options.retry.clone());
        }
        for (name, value) in &self.options.headers {
            if config.header_value(name).is_none() {
                config.headers.insert(name.clone(), value.clone());
            }
        }
        for (name, value) in &config.headers {
            if let Err(err) = HeaderName::try_from(name.as_str()) {
                return Err(Error::InvalidHeader {
                    name: name.clone(),
                    reason: err.to_string(),
                });
            }
            if let Err(err) = HeaderValue::try_from(value.as_str()) {
                return Err(Error::InvalidHeader {
                    name: name.clone(),
                    reason: err.to_string(),
                });
            }
        }
        Ok(config)
    }
}
