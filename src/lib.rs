//! `crossfetch` is an async HTTP request client for native and WASM targets.
//!
//! A single entry point, [`request`] (or [`Client::request`]), sends a
//! [`RequestConfig`] through a [`Transport`] and transparently retries failed
//! attempts:
//! - only idempotent methods are repeated after an error response
//! - retryable statuses default to `100-199`, `429` and `500-599`
//! - the backoff doubles per attempt, starting at 100 ms
//! - failures without any response draw from their own, smaller budget
//!
//! The retry decision itself is exposed as [`should_retry`].

mod client;
mod config;
mod error;
mod options;
mod policy;
mod retry;
mod signal;
mod timer;
mod transport;
mod types;

pub use client::{request, Client};
pub use config::{Body, Method, RequestConfig, ResponseType, ValidateStatusFn};
pub use error::{AttemptFailure, Error, FailureOutcome, TransportError};
pub use options::ClientOptions;
pub use policy::{should_retry, RetryDecision, StopReason};
pub use retry::{
    BoxError, OnRetryAttemptFn, RetryConfig, ShouldRetryFn, DEFAULT_HTTP_METHODS_TO_RETRY,
    DEFAULT_MAX_RETRIES, DEFAULT_NO_RESPONSE_RETRIES, DEFAULT_RETRY_DELAY,
    DEFAULT_STATUS_CODES_TO_RETRY,
};
pub use signal::AbortSignal;
pub use transport::{ReqwestTransport, Transport};
pub use types::{Headers, Response, ResponseData};

pub type Result<T> = std::result::Result<T, Error>;
