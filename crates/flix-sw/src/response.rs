//! Responses handed back to the page.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

/// Response type, as the page would observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin network response.
    Basic,
    /// Cross-origin network response.
    Cors,
    /// Cross-origin no-cors response; status and body are hidden.
    Opaque,
    /// Synthesized by the worker.
    #[default]
    Default,
    /// Network error.
    Error,
}

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Fallback,
}

/// A response.
///
/// Not `Clone`: a response that is both stored and returned must be
/// split with [`Response::duplicate`] first.
#[derive(Debug)]
pub struct Response {
    /// Status code; 0 for network errors.
    pub status: u16,

    /// Status text.
    pub status_text: String,

    /// Response headers.
    pub headers: HeaderMap,

    /// Final URL, if the response came from a fetch.
    pub url: Option<Url>,

    /// Response type.
    pub response_type: ResponseType,

    /// Origin of this answer.
    pub source: ResponseSource,

    body: Bytes,
}

impl Response {
    /// Create a synthesized response.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            url: None,
            response_type: ResponseType::Default,
            source: ResponseSource::Fallback,
            body: body.into(),
        }
    }

    /// Create a response as received from the network.
    pub fn from_network(
        status: StatusCode,
        headers: HeaderMap,
        body: impl Into<Bytes>,
        url: Url,
        response_type: ResponseType,
    ) -> Self {
        Self {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            url: Some(url),
            response_type,
            source: ResponseSource::Network,
            body: body.into(),
        }
    }

    /// Rebuild a response read back from cache storage.
    pub(crate) fn from_cache(
        status: u16,
        status_text: String,
        headers: HeaderMap,
        url: Option<Url>,
        response_type: ResponseType,
        body: Bytes,
    ) -> Self {
        Self {
            status,
            status_text,
            headers,
            url,
            response_type,
            source: ResponseSource::Cache,
            body,
        }
    }

    /// Create a network error response.
    pub fn network_error() -> Self {
        Self {
            status: 0,
            status_text: "Network Error".to_string(),
            headers: HeaderMap::new(),
            url: None,
            response_type: ResponseType::Error,
            source: ResponseSource::Fallback,
            body: Bytes::new(),
        }
    }

    /// Set the status text.
    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the content type.
    pub fn with_content_type(self, content_type: &'static str) -> Self {
        self.with_header(CONTENT_TYPE, HeaderValue::from_static(content_type))
    }

    /// Set the response type.
    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub(crate) fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = source;
        self
    }

    /// Check if the status is 2xx.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Status as an `http` status code; `None` for network errors.
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status).ok()
    }

    /// Check if this is a network error.
    pub fn is_error(&self) -> bool {
        self.response_type == ResponseType::Error
    }

    /// Get the content type.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Borrow the body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response, returning the body.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Get the body as text.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    /// Produce an independent copy, one for storage and one for the caller.
    pub fn duplicate(&self) -> Self {
        Self {
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            url: self.url.clone(),
            response_type: self.response_type,
            source: self.source,
            body: self.body.clone(),
        }
    }
}
