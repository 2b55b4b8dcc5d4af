//! Cache storage: named namespaces of request/response pairs.
//!
//! The [`CacheStore`] trait is the host's persistent key-value cache API.
//! Two backends ship with the crate:
//!
//! - [`MemoryCacheStorage`]: process-local, used by tests and embedders
//! - [`DiskCacheStorage`]: one directory per namespace, survives restarts

use async_trait::async_trait;
use bytes::Bytes;
use http::header::VARY;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::request::CacheKey;
use crate::response::{Response, ResponseType};
use crate::ServiceWorkerError;

mod disk;
mod memory;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;

/// Host cache storage.
///
/// Implementations serialize their own namespace operations; callers take
/// no locks. Concurrent `put`s for one key resolve as last writer wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a namespace, creating it if it does not exist.
    async fn open(&self, namespace: &str) -> Result<(), ServiceWorkerError>;

    /// Look up a key within one namespace. A missing namespace is a miss.
    async fn match_in(
        &self,
        namespace: &str,
        key: &CacheKey,
    ) -> Result<Option<Response>, ServiceWorkerError>;

    /// Look up a key across all namespaces, oldest namespace first.
    async fn match_any(&self, key: &CacheKey) -> Result<Option<Response>, ServiceWorkerError>;

    /// Store a response, replacing any previous entry for the key.
    async fn put(
        &self,
        namespace: &str,
        key: CacheKey,
        response: Response,
    ) -> Result<(), ServiceWorkerError>;

    /// Namespace names in creation order.
    async fn keys(&self) -> Result<Vec<String>, ServiceWorkerError>;

    /// Delete a namespace and everything in it. Returns whether it existed.
    async fn delete(&self, namespace: &str) -> Result<bool, ServiceWorkerError>;

    /// Keys stored in a namespace.
    async fn entries(&self, namespace: &str) -> Result<Vec<CacheKey>, ServiceWorkerError>;
}

/// A stored request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    /// Request identity.
    pub key: CacheKey,

    /// Response status.
    pub status: u16,

    /// Response status text.
    pub status_text: String,

    /// Response headers, in order, duplicates kept.
    pub headers: Vec<(String, String)>,

    /// Final response URL.
    pub url: Option<String>,

    /// Response type.
    pub response_type: ResponseType,

    /// Cached at timestamp (ms since epoch).
    pub cached_at: u64,

    /// Response body; persisted separately by the disk backend.
    #[serde(skip)]
    pub body: Bytes,
}

impl CachedEntry {
    /// Capture a response for storage.
    pub fn from_response(key: CacheKey, response: Response) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Self {
            key,
            status: response.status,
            status_text: response.status_text.clone(),
            headers,
            url: response.url.as_ref().map(|u| u.to_string()),
            response_type: response.response_type,
            cached_at: now_millis(),
            body: response.into_body(),
        }
    }

    /// Rebuild the response this entry was captured from.
    pub fn to_response(&self) -> Response {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(n), Ok(v)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                headers.append(n, v);
            }
        }

        Response::from_cache(
            self.status,
            self.status_text.clone(),
            headers,
            self.url.as_deref().and_then(|u| Url::parse(u).ok()),
            self.response_type,
            self.body.clone(),
        )
    }
}

/// Reject what the Cache API refuses to store.
pub(crate) fn check_storable(key: &CacheKey, response: &Response) -> Result<(), ServiceWorkerError> {
    if !key.is_get() {
        return Err(ServiceWorkerError::Unstorable(format!(
            "{} requests are not cacheable",
            key.method
        )));
    }
    match response.response_type {
        ResponseType::Opaque => {
            return Err(ServiceWorkerError::Unstorable(
                "opaque response".to_string(),
            ))
        }
        ResponseType::Error => {
            return Err(ServiceWorkerError::Unstorable(
                "network error response".to_string(),
            ))
        }
        _ => {}
    }
    if response.status == StatusCode::PARTIAL_CONTENT.as_u16() {
        return Err(ServiceWorkerError::Unstorable(
            "partial content".to_string(),
        ));
    }
    let vary_star = response
        .headers
        .get_all(VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|v| v.trim() == "*");
    if vary_star {
        return Err(ServiceWorkerError::Unstorable("Vary: *".to_string()));
    }
    Ok(())
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
