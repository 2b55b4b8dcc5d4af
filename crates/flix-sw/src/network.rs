//! The host's network primitive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use hashbrown::{HashMap, HashSet};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use tracing::trace;
use url::Url;

use crate::request::Request;
use crate::response::{Response, ResponseType};
use crate::ServiceWorkerError;

/// Issue an outbound request.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send the request exactly as given. `Err` means no response at all
    /// (offline, DNS, connection reset); HTTP error statuses are `Ok`.
    async fn fetch(&self, request: &Request) -> Result<Response, ServiceWorkerError>;
}

#[derive(Debug, Clone)]
struct Canned {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

/// A scripted in-memory network.
///
/// Unknown URLs answer 404. Individual URLs can be made to fail, and the
/// whole network can be switched offline. Every request is recorded.
#[derive(Debug, Default)]
pub struct MemoryNetwork {
    origin: Option<Url>,
    routes: Mutex<HashMap<String, Canned>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    requests: Mutex<Vec<Request>>,
}

impl MemoryNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Responses from `origin` are `Basic`, everything else `Cors`.
    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Serve `body` for `url`.
    pub fn respond(
        &self,
        url: &str,
        status: StatusCode,
        content_type: &'static str,
        body: impl Into<Bytes>,
    ) {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        let canned = Canned {
            status,
            headers,
            body: body.into(),
        };
        lock(&self.routes).insert(normalize(url), canned);
    }

    /// Make requests for `url` fail with a network error.
    pub fn fail(&self, url: &str) {
        lock(&self.failing).insert(normalize(url));
    }

    /// Switch the whole network on or off.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.requests).clone()
    }

    /// Number of requests received for `url`.
    pub fn hits(&self, url: &str) -> usize {
        let url = normalize(url);
        lock(&self.requests)
            .iter()
            .filter(|r| normalize(r.url.as_str()) == url)
            .count()
    }

    /// Total number of requests received.
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl Network for MemoryNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, ServiceWorkerError> {
        lock(&self.requests).push(request.clone());
        let key = normalize(request.url.as_str());
        trace!(method = %request.method, url = %key, "Memory network fetch");

        if self.offline.load(Ordering::SeqCst) || lock(&self.failing).contains(&key) {
            return Err(ServiceWorkerError::NetworkError(format!(
                "failed to fetch {key}"
            )));
        }

        let response_type = match &self.origin {
            Some(origin) if origin.origin() != request.url.origin() => ResponseType::Cors,
            _ => ResponseType::Basic,
        };

        let canned = lock(&self.routes).get(&key).cloned();
        Ok(match canned {
            Some(c) => {
                Response::from_network(c.status, c.headers, c.body, request.url.clone(), response_type)
            }
            None => Response::from_network(
                StatusCode::NOT_FOUND,
                HeaderMap::new(),
                "Not Found",
                request.url.clone(),
                response_type,
            ),
        })
    }
}

fn normalize(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => url.to_string(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_canned_response() {
        let network = MemoryNetwork::new();
        network.respond("https://flix.example/index.html", StatusCode::OK, "text/html", "<html>");

        let response = network.fetch(&get("https://flix.example/index.html")).await.unwrap();
        assert!(response.ok());
        assert_eq!(response.content_type(), Some("text/html"));
        assert_eq!(response.text().unwrap(), "<html>");
        assert_eq!(network.hits("https://flix.example/index.html"), 1);
    }

    #[tokio::test]
    async fn test_unknown_url_is_404() {
        let network = MemoryNetwork::new();
        let response = network.fetch(&get("https://flix.example/missing")).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_failures_and_offline() {
        let network = MemoryNetwork::new();
        network.respond("https://flix.example/a", StatusCode::OK, "text/plain", "a");
        network.fail("https://flix.example/b");

        assert!(network.fetch(&get("https://flix.example/a")).await.is_ok());
        assert!(network.fetch(&get("https://flix.example/b")).await.unwrap_err().is_network());

        network.set_offline(true);
        assert!(network.fetch(&get("https://flix.example/a")).await.is_err());
        assert_eq!(network.call_count(), 3);
    }

    #[tokio::test]
    async fn test_response_type_by_origin() {
        let network = MemoryNetwork::new().with_origin(Url::parse("https://flix.example/").unwrap());

        let same = network.fetch(&get("https://flix.example/a")).await.unwrap();
        let cross = network.fetch(&get("https://cdn.example/a")).await.unwrap();
        assert_eq!(same.response_type, ResponseType::Basic);
        assert_eq!(cross.response_type, ResponseType::Cors);
    }

    #[tokio::test]
    async fn test_records_request_unmodified() {
        let network = MemoryNetwork::new();
        let request = get("https://flix.example/api/rate")
            .with_method(Method::POST)
            .with_body("{\"stars\":5}");

        network.fetch(&request).await.unwrap();

        let seen = network.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].body.as_deref(), Some(&b"{\"stars\":5}"[..]));
    }
}
