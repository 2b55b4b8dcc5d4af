//! Intercepted request descriptors and cache keys.

use std::fmt;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use url::Url;

/// The host's hint about what the request is for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Destination {
    #[default]
    Empty,
    Document,
    Video,
    Audio,
    Image,
    Script,
    Style,
    Font,
    Track,
    Manifest,
    Other(String),
}

impl Destination {
    /// Parse the host's string form (`"video"`, `"document"`, ...).
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "document" => Self::Document,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "image" => Self::Image,
            "script" => Self::Script,
            "style" => Self::Style,
            "font" => Self::Font,
            "track" => Self::Track,
            "manifest" => Self::Manifest,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Document => "document",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Script => "script",
            Self::Style => "style",
            Self::Font => "font",
            Self::Track => "track",
            Self::Manifest => "manifest",
            Self::Other(s) => s,
        }
    }
}

/// Request mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// An intercepted outbound request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method.
    pub method: Method,

    /// Absolute request URL.
    pub url: Url,

    /// Destination hint.
    pub destination: Destination,

    /// Request mode.
    pub mode: RequestMode,

    /// Request headers.
    pub headers: HeaderMap,

    /// Request body (non-GET only).
    pub body: Option<Bytes>,
}

impl Request {
    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            destination: Destination::Empty,
            mode: RequestMode::Cors,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a page navigation request.
    pub fn navigate(url: Url) -> Self {
        Self {
            destination: Destination::Document,
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }

    /// Set the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the destination hint.
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Set the mode.
    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Check if this is a page navigation.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// The identity this request is cached under.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.method, &self.url)
    }
}

/// Normalized request identity: method plus URL without its fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
}

impl CacheKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.as_str().to_string(),
            url: url.into(),
        }
    }

    /// Key for a GET of `url`.
    pub fn get(url: &Url) -> Self {
        Self::new(&Method::GET, url)
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET.as_str()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_parse() {
        assert_eq!(Destination::parse("video"), Destination::Video);
        assert_eq!(Destination::parse("VIDEO"), Destination::Video);
        assert_eq!(Destination::parse(""), Destination::Empty);
        assert_eq!(
            Destination::parse("paintworklet"),
            Destination::Other("paintworklet".to_string())
        );
        assert_eq!(Destination::parse("document").as_str(), "document");
    }

    #[test]
    fn test_navigate_request() {
        let url = Url::parse("https://flix.example/browse").unwrap();
        let request = Request::navigate(url);
        assert!(request.is_navigation());
        assert_eq!(request.destination, Destination::Document);
        assert_eq!(request.method, Method::GET);

        let plain = Request::get(Url::parse("https://flix.example/app.js").unwrap());
        assert!(!plain.is_navigation());
    }

    #[test]
    fn test_cache_key_drops_fragment() {
        let a = Url::parse("https://flix.example/index.html#top").unwrap();
        let b = Url::parse("https://flix.example/index.html").unwrap();
        assert_eq!(CacheKey::get(&a), CacheKey::get(&b));
        assert_eq!(
            CacheKey::get(&b).to_string(),
            "GET https://flix.example/index.html"
        );
    }

    #[test]
    fn test_cache_key_keeps_query_and_method() {
        let a = Url::parse("https://flix.example/v.mp4?q=1").unwrap();
        let b = Url::parse("https://flix.example/v.mp4").unwrap();
        assert_ne!(CacheKey::get(&a), CacheKey::get(&b));

        let post = CacheKey::new(&Method::POST, &b);
        assert!(!post.is_get());
        assert_ne!(post, CacheKey::get(&b));
    }
}
