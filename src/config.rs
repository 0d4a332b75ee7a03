use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::{AbortSignal, Headers, RetryConfig};

/// HTTP request method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Delete,
    Put,
    Connect,
    Options,
    Trace,
    Patch,
}

impl Method {
    /// Upper-case method token as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Put => "PUT",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let method = match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "DELETE" => Self::Delete,
            "PUT" => Self::Put,
            "CONNECT" => Self::Connect,
            "OPTIONS" => Self::Options,
            "TRACE" => Self::Trace,
            "PATCH" => Self::Patch,
            other => return Err(format!("unsupported http method '{other}'")),
        };
        Ok(method)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
            Method::Put => reqwest::Method::PUT,
            Method::Connect => reqwest::Method::CONNECT,
            Method::Options => reqwest::Method::OPTIONS,
            Method::Trace => reqwest::Method::TRACE,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Request payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// How the response body should be decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// Parse as JSON, keeping the raw text when the body is not valid JSON.
    #[default]
    Json,
    Text,
    /// Raw bytes (`arraybuffer`/`blob` in browser terms).
    Bytes,
}

/// Predicate deciding which statuses count as success.
pub type ValidateStatusFn = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// Description of one logical request.
///
/// The client fills in `timeout` and `retry_config` from its
/// [`crate::ClientOptions`] when they are left unset.
#[derive(Clone, Default)]
pub struct RequestConfig {
    pub url: String,
    pub method: Method,
    /// Header names are matched case-insensitively.
    pub headers: Headers,
    pub body: Body,
    /// Querystring pairs appended to `url`.
    pub params: Vec<(String, String)>,
    /// Per-attempt timeout.
    pub timeout: Option<Duration>,
    pub response_type: ResponseType,
    /// Defaults to `200 <= status < 300` when unset.
    pub validate_status: Option<ValidateStatusFn>,
    /// Disables retries entirely when `Some(false)`.
    pub retry: Option<bool>,
    pub retry_config: Option<RetryConfig>,
    pub signal: Option<AbortSignal>,
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("params", &self.params)
            .field("timeout", &self.timeout)
            .field("response_type", &self.response_type)
            .field(
                "validate_status",
                &self.validate_status.as_ref().map(|_| "<fn>"),
            )
            .field("retry", &self.retry)
            .field("retry_config", &self.retry_config)
            .field("signal", &self.signal)
            .finish()
    }
}

impl RequestConfig {
    /// Creates a `GET` request for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::Get)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::Head)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::Post)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::Put)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::Patch)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::Delete)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets a header, replacing any value stored under the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    /// Sets a raw body (`data` in browser terms).
    pub fn data(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Serializes `value` as a JSON body.
    ///
    /// `content-type: application/json` is added unless already present.
    pub fn json<T: Serialize>(mut self, value: &T) -> serde_json::Result<Self> {
        self.body = Body::Json(serde_json::to_value(value)?);
        if self.header_value("content-type").is_none() {
            self = self.header("content-type", "application/json");
        }
        Ok(self)
    }

    /// Appends one querystring pair.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Overrides which statuses count as success.
    pub fn validate_status<F>(mut self, predicate: F) -> Self
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        self.validate_status = Some(Arc::new(predicate));
        self
    }

    /// Enables or disables retries for this request.
    pub fn retry(mut self, enabled: bool) -> Self {
        self.retry = Some(enabled);
        self
    }

    pub fn retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = Some(retry_config);
        self
    }

    /// Attaches a cancellation signal.
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Looks up a header value by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether `status` is accepted as a successful response.
    pub fn is_status_valid(&self, status: u16) -> bool {
        match &self.validate_status {
            Some(predicate) => predicate(status),
            None => (200..300).contains(&status),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.signal
            .as_ref()
            .is_some_and(|signal| signal.is_aborted())
    }
}
