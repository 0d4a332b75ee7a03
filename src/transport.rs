use std::fmt;

use reqwest::header::{HeaderName, HeaderValue};

use crate::{
    signal::abortable, Body, Headers, RequestConfig, Response, ResponseData, ResponseType,
    TransportError,
};

/// Performs one physical attempt of a request.
///
/// Implementations return `Ok` whenever the server produced a response,
/// whatever its status; status validation and retries happen in
/// [`crate::Client`]. `Err` means no response was obtained. Implementations
/// that can interrupt a call in flight should return
/// [`TransportError::Aborted`] once `config.signal` fires.
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait Transport {
    async fn attempt(&self, config: &RequestConfig) -> Result<Response, TransportError>;
}

/// Transport backed by `reqwest`.
///
/// Uses a native socket client on regular targets and the browser Fetch API
/// on `wasm32`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a preconfigured `reqwest` client (proxies, TLS roots, ...).
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn build(&self, config: &RequestConfig) -> Result<reqwest::RequestBuilder, TransportError> {
        let mut builder = self.http.request(config.method.into(), &config.url);

        if !config.params.is_empty() {
            builder = builder.query(&config.params);
        }

        for (name, value) in &config.headers {
            let name = HeaderName::try_from(name.as_str()).map_err(|err| {
                TransportError::other(format!("invalid header name '{name}': {err}"))
            })?;
            let value = HeaderValue::try_from(value.as_str()).map_err(|err| {
                TransportError::other(format!("invalid value for header '{name}': {err}"))
            })?;
            builder = builder.header(name, value);
        }

        // On WASM, reqwest uses AbortController for the timeout.
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match &config.body {
            Body::Empty => builder,
            Body::Text(text) => builder.body(text.clone()),
            Body::Bytes(bytes) => builder.body(bytes.clone()),
            Body::Json(value) => builder.json(value),
        };

        Ok(builder)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
impl Transport for ReqwestTransport {
    async fn attempt(&self, config: &RequestConfig) -> Result<Response, TransportError> {
        let signal = config.signal.as_ref();
        let response = abortable(signal, self.build(config)?.send()).await??;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_ascii_lowercase(), value.to_owned()))
            })
            .collect();
        let body = abortable(signal, response.bytes()).await??;

        Ok(Response {
            status,
            headers,
            data: decode_body(&body, config.response_type),
            url,
        })
    }
}

pub(crate) fn decode_body(body: &[u8], response_type: ResponseType) -> ResponseData {
    if body.is_empty() {
        return ResponseData::Empty;
    }
    match response_type {
        ResponseType::Bytes => ResponseData::Bytes(body.to_vec()),
        ResponseType::Text => ResponseData::Text(String::from_utf8_lossy(body).into_owned()),
        ResponseType::Json => match serde_json::from_slice(body) {
            Ok(value) => ResponseData::Json(value),
            Err(_) => ResponseData::Text(String::from_utf8_lossy(body).into_owned()),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::decode_body;
    use crate::{ResponseData, ResponseType};

    #[test]
    fn json_bodies_are_parsed() {
        assert_eq!(
            decode_body(br#"{"ok":true}"#, ResponseType::Json),
            ResponseData::Json(json!({"ok": true}))
        );
    }

    #[test]
    fn invalid_json_falls_back_to_text() {
        assert_eq!(
            decode_body(b"response", ResponseType::Json),
            ResponseData::Text("response".to_owned())
        );
    }

    #[test]
    fn text_and_bytes_are_kept_raw() {
        assert_eq!(
            decode_body(b"[1]", ResponseType::Text),
            ResponseData::Text("[1]".to_owned())
        );
        assert_eq!(
            decode_body(&[0xff, 0x00], ResponseType::Bytes),
            ResponseData::Bytes(vec![0xff, 0x00])
        );
        assert_eq!(decode_body(b"", ResponseType::Json), ResponseData::Empty);
    }
}
