use crate::{RequestConfig, Response};

/// Failure of a single attempt where no response was obtained.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    /// The attempt was aborted through its cancellation signal.
    #[error("request aborted")]
    Aborted,
    /// Failure reported by a custom transport.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(err) if err.is_timeout())
    }
}

/// Why an attempt failed.
#[derive(Debug)]
pub enum FailureOutcome {
    /// The server answered with a status rejected by `validate_status`.
    Response(Response),
    /// No response was received.
    NoResponse(TransportError),
}

/// A failed attempt together with the configuration that produced it.
#[derive(Debug)]
pub struct AttemptFailure {
    pub outcome: FailureOutcome,
    pub config: RequestConfig,
}

impl AttemptFailure {
    pub fn response(&self) -> Option<&Response> {
        match &self.outcome {
            FailureOutcome::Response(response) => Some(response),
            FailureOutcome::NoResponse(_) => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response().map(|response| response.status)
    }

    pub fn is_no_response(&self) -> bool {
        matches!(self.outcome, FailureOutcome::NoResponse(_))
    }

    /// Converts the failure into the error surfaced to the caller.
    pub(crate) fn into_error(self, attempts: u32) -> Error {
        let config = Box::new(self.config);
        match self.outcome {
            FailureOutcome::Response(response) => Error::Response {
                response: Box::new(response),
                config,
                attempts,
            },
            FailureOutcome::NoResponse(source) => Error::NoResponse {
                source,
                config,
                attempts,
            },
        }
    }
}

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with a rejected status on the final attempt.
    #[error("request failed with status code {} after {attempts} attempt(s)", .response.status)]
    Response {
        response: Box<Response>,
        /// Configuration of the final attempt.
        config: Box<RequestConfig>,
        attempts: u32,
    },
    /// No response was received on the final attempt.
    #[error("no response received after {attempts} attempt(s): {source}")]
    NoResponse {
        #[source]
        source: TransportError,
        /// Configuration of the final attempt.
        config: Box<RequestConfig>,
        attempts: u32,
    },
    /// The caller's cancellation signal fired.
    #[error("request cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
    /// The request URL could not be parsed; nothing was sent.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// A header name or value cannot be sent; nothing was sent.
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}

impl Error {
    /// Status code of the final response as a string, if there was one.
    pub fn code(&self) -> Option<String> {
        self.response().map(|response| response.status.to_string())
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Response { response, .. } => Some(response.as_ref()),
            _ => None,
        }
    }

    pub fn config(&self) -> Option<&RequestConfig> {
        match self {
            Self::Response { config, .. } | Self::NoResponse { config, .. } => {
                Some(config.as_ref())
            }
            _ => None,
        }
    }

    /// Number of attempts made before the request gave up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Response { attempts, .. }
            | Self::NoResponse { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
            Self::InvalidUrl { .. } | Self::InvalidHeader { .. } => 0,
        }
    }
}
