//! Fixed worker configuration.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ServiceWorkerError;

/// Worker configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Origin the worker is served from; relative paths resolve against it.
    pub origin: Url,

    /// Namespace for the app shell and other static assets.
    pub shell_cache: String,

    /// Namespace for video assets.
    pub media_cache: String,

    /// Paths pre-cached on install and served cache-first.
    pub shell_assets: Vec<String>,

    /// Document served to navigations when offline.
    pub shell_document: String,

    /// Media file extensions, without the dot, matched case-insensitively.
    pub media_extensions: Vec<String>,

    /// Path of the JSON catalog resource.
    pub catalog_path: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse("http://localhost:8080/").expect("static origin is valid"),
            shell_cache: "fahadflix-app-v1".to_string(),
            media_cache: "videos-v1".to_string(),
            shell_assets: vec!["/".to_string(), "/index.html".to_string()],
            shell_document: "/index.html".to_string(),
            media_extensions: vec!["mp4".to_string(), "webm".to_string(), "m3u8".to_string()],
            catalog_path: "/catalog.json".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Create a configuration for the given origin with default everything else.
    pub fn for_origin(origin: Url) -> Self {
        Self {
            origin,
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ServiceWorkerError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ServiceWorkerError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for contradictions.
    pub fn validate(&self) -> Result<(), ServiceWorkerError> {
        if self.shell_cache.is_empty() || self.media_cache.is_empty() {
            return Err(ServiceWorkerError::ConfigError(
                "cache names must not be empty".to_string(),
            ));
        }
        if self.shell_cache == self.media_cache {
            return Err(ServiceWorkerError::ConfigError(format!(
                "shell and media caches share the name {:?}",
                self.shell_cache
            )));
        }
        if !self.shell_assets.contains(&self.shell_document) {
            return Err(ServiceWorkerError::ConfigError(format!(
                "shell document {} is not a shell asset",
                self.shell_document
            )));
        }
        if let Some(bad) = self.shell_assets.iter().find(|p| !p.starts_with('/')) {
            return Err(ServiceWorkerError::ConfigError(format!(
                "shell asset {bad} is not an absolute path"
            )));
        }
        self.shell_document_url()?;
        Ok(())
    }

    /// Namespaces that survive activation.
    pub fn current_namespaces(&self) -> [&str; 2] {
        [self.shell_cache.as_str(), self.media_cache.as_str()]
    }

    /// Check whether a namespace is recognized.
    pub fn is_current(&self, namespace: &str) -> bool {
        self.current_namespaces().contains(&namespace)
    }

    /// Resolve a path against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, ServiceWorkerError> {
        self.origin
            .join(path)
            .map_err(|e| ServiceWorkerError::ConfigError(format!("{path}: {e}")))
    }

    /// Absolute URL of the offline shell document.
    pub fn shell_document_url(&self) -> Result<Url, ServiceWorkerError> {
        self.resolve(&self.shell_document)
    }

    /// Whether `url` is on the worker's origin.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    /// Whether `url` names the catalog resource.
    pub fn is_catalog(&self, url: &Url) -> bool {
        url.path() == self.catalog_path
    }
}
