//! On-disk cache storage.
//!
//! Layout under the root directory:
//!
//! ```text
//! caches.json                  namespace names, creation order
//! <sha256(namespace)>/
//!     <sha256(key)>.json       CachedEntry metadata
//!     <sha256(key)>.bin        response body
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use super::{check_storable, CacheStore, CachedEntry};
use crate::request::CacheKey;
use crate::response::Response;
use crate::ServiceWorkerError;

const MANIFEST: &str = "caches.json";

/// Persistent cache storage rooted at a directory.
#[derive(Debug)]
pub struct DiskCacheStorage {
    root: PathBuf,
    /// Writers hold it exclusively, so a reader never sees the body of one
    /// write paired with the metadata of another.
    lock: RwLock<()>,
}

impl DiskCacheStorage {
    /// Open storage at `root`, creating the directory if needed.
    pub async fn open_at(root: impl Into<PathBuf>) -> Result<Self, ServiceWorkerError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(io_err(&root))?;
        debug!(root = %root.display(), "Opened disk cache storage");
        Ok(Self {
            root,
            lock: RwLock::new(()),
        })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(digest(namespace))
    }

    fn entry_paths(&self, namespace: &str, key: &CacheKey) -> (PathBuf, PathBuf) {
        let dir = self.namespace_dir(namespace);
        let name = digest(&key.to_string());
        (
            dir.join(format!("{name}.json")),
            dir.join(format!("{name}.bin")),
        )
    }

    async fn read_manifest(&self) -> Result<Vec<String>, ServiceWorkerError> {
        let path = self.root.join(MANIFEST);
        match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ServiceWorkerError::CacheError(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    async fn write_manifest(&self, names: &[String]) -> Result<(), ServiceWorkerError> {
        let path = self.root.join(MANIFEST);
        let json = serde_json::to_vec_pretty(names)
            .map_err(|e| ServiceWorkerError::CacheError(e.to_string()))?;
        write_atomic(&path, &json).await
    }

    /// Create the namespace if missing. Caller holds the lock exclusively.
    async fn ensure_namespace(&self, namespace: &str) -> Result<(), ServiceWorkerError> {
        let dir = self.namespace_dir(namespace);
        fs::create_dir_all(&dir).await.map_err(io_err(&dir))?;

        let mut names = self.read_manifest().await?;
        if !names.iter().any(|n| n == namespace) {
            names.push(namespace.to_string());
            self.write_manifest(&names).await?;
            debug!(namespace, "Created cache namespace");
        }
        Ok(())
    }

    /// Caller holds the lock.
    async fn read_entry(
        &self,
        namespace: &str,
        key: &CacheKey,
    ) -> Result<Option<Response>, ServiceWorkerError> {
        let (meta_path, body_path) = self.entry_paths(namespace, key);

        let meta = match fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&meta_path)(e)),
        };
        let mut entry: CachedEntry = serde_json::from_slice(&meta)
            .map_err(|e| ServiceWorkerError::CacheError(format!("{}: {e}", meta_path.display())))?;

        // Hash collision or a stale file from another key
        if &entry.key != key {
            warn!(key = %key, stored = %entry.key, "Cache entry key mismatch");
            return Ok(None);
        }

        let body = fs::read(&body_path).await.map_err(io_err(&body_path))?;
        entry.body = Bytes::from(body);
        Ok(Some(entry.to_response()))
    }
}

#[async_trait]
impl CacheStore for DiskCacheStorage {
    async fn open(&self, namespace: &str) -> Result<(), ServiceWorkerError> {
        let _guard = self.lock.write().await;
        self.ensure_namespace(namespace).await
    }

    async fn match_in(
        &self,
        namespace: &str,
        key: &CacheKey,
    ) -> Result<Option<Response>, ServiceWorkerError> {
        let _guard = self.lock.read().await;
        self.read_entry(namespace, key).await
    }

    async fn match_any(&self, key: &CacheKey) -> Result<Option<Response>, ServiceWorkerError> {
        let _guard = self.lock.read().await;
        for namespace in self.read_manifest().await? {
            if let Some(response) = self.read_entry(&namespace, key).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    async fn put(
        &self,
        namespace: &str,
        key: CacheKey,
        response: Response,
    ) -> Result<(), ServiceWorkerError> {
        check_storable(&key, &response)?;
        let entry = CachedEntry::from_response(key, response);
        let meta = serde_json::to_vec(&entry)
            .map_err(|e| ServiceWorkerError::CacheError(e.to_string()))?;
        let (meta_path, body_path) = self.entry_paths(namespace, &entry.key);

        let _guard = self.lock.write().await;
        self.ensure_namespace(namespace).await?;

        // Body first: on a fresh key the metadata is what makes it visible.
        write_atomic(&body_path, &entry.body).await?;
        write_atomic(&meta_path, &meta).await?;

        trace!(namespace, key = %entry.key, bytes = entry.body.len(), "Stored entry on disk");
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, ServiceWorkerError> {
        let _guard = self.lock.read().await;
        self.read_manifest().await
    }

    async fn delete(&self, namespace: &str) -> Result<bool, ServiceWorkerError> {
        let _guard = self.lock.write().await;

        let mut names = self.read_manifest().await?;
        let existed = names.iter().any(|n| n == namespace);
        if existed {
            names.retain(|n| n != namespace);
            self.write_manifest(&names).await?;
        }

        let dir = self.namespace_dir(namespace);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&dir)(e)),
        }
        Ok(existed)
    }

    async fn entries(&self, namespace: &str) -> Result<Vec<CacheKey>, ServiceWorkerError> {
        let _guard = self.lock.read().await;
        let dir = self.namespace_dir(namespace);
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&dir)(e)),
        };

        let mut keys = Vec::new();
        while let Some(item) = read_dir.next_entry().await.map_err(io_err(&dir))? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await.map_err(io_err(&path))?;
            match serde_json::from_slice::<CachedEntry>(&bytes) {
                Ok(entry) => keys.push(entry.key),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable entry"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

fn io_err(path: &Path) -> impl Fn(std::io::Error) -> ServiceWorkerError + '_ {
    move |e| ServiceWorkerError::CacheError(format!("{}: {e}", path.display()))
}

/// Write via a temp file and rename so readers never see a partial file.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ServiceWorkerError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).await.map_err(io_err(&tmp))?;
    fs::rename(&tmp, path).await.map_err(io_err(path))
}
