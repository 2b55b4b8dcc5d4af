//! In-memory cache storage.

use async_trait::async_trait;
use hashbrown::HashMap;
use tokio::sync::RwLock;
use tracing::trace;

use super::{check_storable, CacheStore, CachedEntry};
use crate::request::CacheKey;
use crate::response::Response;
use crate::ServiceWorkerError;

/// A single namespace.
#[derive(Debug, Default)]
struct Cache {
    entries: HashMap<CacheKey, CachedEntry>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Namespace names in creation order.
    order: Vec<String>,
    caches: HashMap<String, Cache>,
}

impl Inner {
    fn open(&mut self, name: &str) -> &mut Cache {
        if !self.caches.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.caches.entry(name.to_string()).or_default()
    }
}

/// Process-local cache storage.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    inner: RwLock<Inner>,
}

impl MemoryCacheStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a namespace exists.
    pub async fn has(&self, namespace: &str) -> bool {
        self.inner.read().await.caches.contains_key(namespace)
    }

    /// Number of entries in a namespace.
    pub async fn len(&self, namespace: &str) -> usize {
        self.inner
            .read()
            .await
            .caches
            .get(namespace)
            .map_or(0, |c| c.entries.len())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStorage {
    async fn open(&self, namespace: &str) -> Result<(), ServiceWorkerError> {
        self.inner.write().await.open(namespace);
        Ok(())
    }

    async fn match_in(
        &self,
        namespace: &str,
        key: &CacheKey,
    ) -> Result<Option<Response>, ServiceWorkerError> {
        let inner = self.inner.read().await;
        Ok(inner
            .caches
            .get(namespace)
            .and_then(|cache| cache.entries.get(key))
            .map(CachedEntry::to_response))
    }

    async fn match_any(&self, key: &CacheKey) -> Result<Option<Response>, ServiceWorkerError> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|name| inner.caches.get(name))
            .find_map(|cache| cache.entries.get(key))
            .map(CachedEntry::to_response))
    }

    async fn put(
        &self,
        namespace: &str,
        key: CacheKey,
        response: Response,
    ) -> Result<(), ServiceWorkerError> {
        check_storable(&key, &response)?;
        let entry = CachedEntry::from_response(key.clone(), response);

        trace!(namespace, key = %key, "Storing entry");
        self.inner
            .write()
            .await
            .open(namespace)
            .entries
            .insert(key, entry);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, ServiceWorkerError> {
        Ok(self.inner.read().await.order.clone())
    }

    async fn delete(&self, namespace: &str) -> Result<bool, ServiceWorkerError> {
        let mut inner = self.inner.write().await;
        inner.order.retain(|n| n != namespace);
        Ok(inner.caches.remove(namespace).is_some())
    }

    async fn entries(&self, namespace: &str) -> Result<Vec<CacheKey>, ServiceWorkerError> {
        let inner = self.inner.read().await;
        let mut keys: Vec<CacheKey> = inner
            .caches
            .get(namespace)
            .map(|cache| cache.entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}
