//! Retry decisions for failed attempts.
//!
//! [`should_retry`] is a pure function of the failed attempt apart from the
//! optional caller hooks stored in its [`RetryConfig`].

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use crate::{AttemptFailure, FailureOutcome, Method, RequestConfig, RetryConfig};

/// Outcome of evaluating a failed attempt.
#[derive(Clone, Debug)]
pub enum RetryDecision {
    /// Wait `delay`, then run the next attempt with `config`.
    Retry {
        delay: Duration,
        /// Copy of the failed attempt's config with its counters advanced.
        config: RequestConfig,
    },
    /// Surface the failure to the caller.
    Stop(StopReason),
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }

    /// Backoff before the next attempt, if one is allowed.
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::Retry { delay, .. } => Some(*delay),
            Self::Stop(_) => None,
        }
    }
}

/// Rule that ended the retry loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Retries were disabled on the request.
    Disabled,
    /// The method is not considered safe to repeat.
    MethodNotRetryable(Method),
    /// The status falls outside every retryable range.
    StatusNotRetryable(u16),
    /// The budget for failures without a response is spent.
    NoResponseRetriesExhausted,
    /// `current_retry_attempt` reached `max_retries`.
    RetriesExhausted,
    /// The caller's `should_retry` predicate declined.
    RejectedByPredicate,
}

/// Decides whether `failure` should be retried.
///
/// Rules, first match wins:
/// 1. retries disabled on the request;
/// 2. response received for a method outside `http_methods_to_retry`;
/// 3. no response and `no_response_attempt >= no_response_retries`;
/// 4. `current_retry_attempt >= max_retries`;
/// 5. the caller's `should_retry` predicate, when present, is authoritative;
/// 6. otherwise the response status must fall within `status_codes_to_retry`.
///
/// On retry the returned config has `current_retry_attempt` incremented (and
/// `no_response_attempt` too for failures without a response), and
/// `on_retry_attempt` is notified. Errors returned by the observer are
/// swallowed.
pub fn should_retry(failure: &AttemptFailure) -> RetryDecision {
    let config = &failure.config;
    if config.retry == Some(false) {
        return RetryDecision::Stop(StopReason::Disabled);
    }

    let defaults;
    let retry = match &config.retry_config {
        Some(retry) => retry,
        None => {
            defaults = RetryConfig::default();
            &defaults
        }
    };

    if let Some(reason) = check_structural_limits(retry, config.method, &failure.outcome) {
        return RetryDecision::Stop(reason);
    }

    match &retry.should_retry {
        Some(predicate) => {
            if !predicate(failure) {
                return RetryDecision::Stop(StopReason::RejectedByPredicate);
            }
        }
        None => {
            if let FailureOutcome::Response(response) = &failure.outcome {
                if !retry.is_status_retryable(response.status) {
                    return RetryDecision::Stop(StopReason::StatusNotRetryable(response.status));
                }
            }
        }
    }

    let delay = retry.backoff_delay(retry.current_retry_attempt);

    let mut next = retry.clone();
    next.current_retry_attempt += 1;
    if failure.is_no_response() {
        next.no_response_attempt += 1;
    }

    notify_retry_attempt(retry, failure);

    let mut config = config.clone();
    config.retry_config = Some(next);
    RetryDecision::Retry { delay, config }
}

fn check_structural_limits(
    retry: &RetryConfig,
    method: Method,
    outcome: &FailureOutcome,
) -> Option<StopReason> {
    match outcome {
        FailureOutcome::Response(_) => {
            if !retry.is_method_retryable(method) {
                return Some(StopReason::MethodNotRetryable(method));
            }
        }
        FailureOutcome::NoResponse(_) => {
            if retry.no_response_attempt >= retry.no_response_retries {
                return Some(StopReason::NoResponseRetriesExhausted);
            }
        }
    }

    if retry.current_retry_attempt >= retry.max_retries {
        return Some(StopReason::RetriesExhausted);
    }
    None
}

fn notify_retry_attempt(retry: &RetryConfig, failure: &AttemptFailure) {
    let Some(observer) = &retry.on_retry_attempt else {
        return;
    };
    // Observer failures never change the decision, panics included.
    match panic::catch_unwind(AssertUnwindSafe(|| observer(failure))) {
        Ok(Ok(())) => {}
        Ok(Err(_err)) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("on_retry_attempt observer failed: {}", _err);
        }
        Err(_panic) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("on_retry_attempt observer panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;

    use super::{should_retry, RetryDecision, StopReason};
    use crate::{
        AttemptFailure, FailureOutcome, Headers, Method, RequestConfig, Response, ResponseData,
        RetryConfig, TransportError,
    };

    fn http_failure(config: RequestConfig, status: u16) -> AttemptFailure {
        AttemptFailure {
            outcome: FailureOutcome::Response(Response {
                status,
                headers: Headers::new(),
                data: ResponseData::Empty,
                url: config.url.clone(),
            }),
            config,
        }
    }

    fn no_response_failure(config: RequestConfig) -> AttemptFailure {
        AttemptFailure {
            outcome: FailureOutcome::NoResponse(TransportError::other("connection refused")),
            config,
        }
    }

    fn with_retry(method: Method, retry: RetryConfig) -> RequestConfig {
        RequestConfig::new("http://localhost/")
            .method(method)
            .retry_config(retry)
    }

    fn next_config(decision: RetryDecision) -> RequestConfig {
        match decision {
            RetryDecision::Retry { config, .. } => config,
            RetryDecision::Stop(reason) => panic!("expected retry, got {reason:?}"),
        }
    }

    #[test]
    fn disabled_never_retries() {
        let config = RequestConfig::get("http://localhost/").retry(false);
        for failure in [
            http_failure(config.clone(), 503),
            no_response_failure(config.clone()),
        ] {
            assert!(matches!(
                should_retry(&failure),
                RetryDecision::Stop(StopReason::Disabled)
            ));
        }
    }

    #[test]
    fn post_is_not_retried_even_for_503() {
        let failure = http_failure(RequestConfig::post("http://localhost/"), 503);
        assert!(matches!(
            should_retry(&failure),
            RetryDecision::Stop(StopReason::MethodNotRetryable(Method::Post))
        ));
    }

    #[test]
    fn get_503_backs_off_exponentially() {
        let mut config = RequestConfig::get("http://localhost/");
        let mut delays = Vec::new();
        for _ in 0..3 {
            let decision = should_retry(&http_failure(config, 503));
            delays.push(decision.delay().expect("503 on GET must be retried"));
            config = next_config(decision);
        }

        assert_eq!(
            delays,
            [
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
        let retry = config.retry_config.as_ref().expect("defaults filled in");
        assert_eq!(retry.current_retry_attempt, 3);
        assert!(matches!(
            should_retry(&http_failure(config, 503)),
            RetryDecision::Stop(StopReason::RetriesExhausted)
        ));
    }

    #[test]
    fn non_retryable_status_stops() {
        let failure = http_failure(RequestConfig::get("http://localhost/"), 404);
        assert!(matches!(
            should_retry(&failure),
            RetryDecision::Stop(StopReason::StatusNotRetryable(404))
        ));
    }

    #[test]
    fn exhausted_config_is_idempotent_and_silent() {
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        let retry = RetryConfig {
            current_retry_attempt: 3,
            ..RetryConfig::default()
        }
        .with_on_retry_attempt(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let failure = http_failure(with_retry(Method::Get, retry), 500);

        for _ in 0..2 {
            assert!(matches!(
                should_retry(&failure),
                RetryDecision::Stop(StopReason::RetriesExhausted)
            ));
        }
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn attempts_beyond_max_stay_exhausted() {
        for attempt in 3..10 {
            let retry = RetryConfig {
                current_retry_attempt: attempt,
                ..RetryConfig::default()
            };
            let failure = no_response_failure(with_retry(Method::Get, retry));
            assert!(!should_retry(&failure).is_retry(), "attempt {attempt}");
        }
    }

    #[test]
    fn third_no_response_failure_stops_with_budget_left() {
        let retry = RetryConfig::default().with_max_retries(10);
        let mut config = with_retry(Method::Get, retry);

        for _ in 0..2 {
            config = next_config(should_retry(&no_response_failure(config)));
        }
        let retry = config.retry_config.as_ref().expect("retry config present");
        assert_eq!(retry.no_response_attempt, 2);
        assert_eq!(retry.current_retry_attempt, 2);

        assert!(matches!(
            should_retry(&no_response_failure(config)),
            RetryDecision::Stop(StopReason::NoResponseRetriesExhausted)
        ));
    }

    #[test]
    fn http_retries_do_not_spend_no_response_budget() {
        let config = next_config(should_retry(&http_failure(
            RequestConfig::get("http://localhost/"),
            500,
        )));
        let retry = config.retry_config.as_ref().expect("retry config present");
        assert_eq!(retry.current_retry_attempt, 1);
        assert_eq!(retry.no_response_attempt, 0);
    }

    #[test]
    fn predicate_overrides_status_ranges() {
        let retry = RetryConfig::default().with_should_retry(|failure| failure.status() == Some(404));
        let decision = should_retry(&http_failure(with_retry(Method::Get, retry.clone()), 404));
        assert!(decision.is_retry());

        let decision = should_retry(&http_failure(with_retry(Method::Get, retry), 503));
        assert!(matches!(
            decision,
            RetryDecision::Stop(StopReason::RejectedByPredicate)
        ));
    }

    #[test]
    fn predicate_cannot_bypass_method_gate_or_exhaustion() {
        let retry = RetryConfig::default().with_should_retry(|_| true);
        let failure = http_failure(with_retry(Method::Patch, retry.clone()), 503);
        assert!(matches!(
            should_retry(&failure),
            RetryDecision::Stop(StopReason::MethodNotRetryable(Method::Patch))
        ));

        let exhausted = RetryConfig {
            current_retry_attempt: 3,
            ..retry
        };
        let failure = http_failure(with_retry(Method::Get, exhausted), 503);
        assert!(matches!(
            should_retry(&failure),
            RetryDecision::Stop(StopReason::RetriesExhausted)
        ));
    }

    #[test]
    fn observer_errors_do_not_veto_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let retry = RetryConfig::default().with_on_retry_attempt(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("observer exploded".into())
        });

        let decision = should_retry(&http_failure(with_retry(Method::Get, retry), 502));
        assert_eq!(decision.delay(), Some(Duration::from_millis(100)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_panics_do_not_veto_retry() {
        let retry = RetryConfig::default().with_on_retry_attempt(|_| panic!("observer bug"));

        let decision = should_retry(&http_failure(with_retry(Method::Get, retry), 503));
        assert!(decision.is_retry());
        assert_eq!(decision.delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn no_response_failures_ignore_method_gate() {
        let failure = no_response_failure(RequestConfig::post("http://localhost/"));
        assert!(should_retry(&failure).is_retry());
    }
}
