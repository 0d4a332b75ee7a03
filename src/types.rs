use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

/// Header map. Response headers are stored with lowercased names.
pub type Headers = BTreeMap<String, String>;

/// Decoded response body.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseData {
    Empty,
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl ResponseData {
    /// Returns the body as text when it was decoded as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the parsed JSON value, if any.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Response of a single attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub data: ResponseData,
    /// Final URL after redirects.
    pub url: String,
}

impl Response {
    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Deserializes the body into `T`.
    ///
    /// Text bodies are parsed as JSON as well, so this works regardless of
    /// the requested [`crate::ResponseType`].
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        match &self.data {
            ResponseData::Json(value) => serde_json::from_value(value.clone()),
            ResponseData::Text(text) => serde_json::from_str(text),
            ResponseData::Bytes(bytes) => serde_json::from_slice(bytes),
            ResponseData::Empty => serde_json::from_str("null"),
        }
    }
}
