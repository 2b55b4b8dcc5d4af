//! Host configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use flix_common::{FlixError, Result};
use flix_net::LoaderConfig;
use flix_sw::WorkerConfig;
use serde::{Deserialize, Serialize};

/// Host configuration, loaded from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Worker routing and cache names
    pub worker: WorkerConfig,

    /// Cache storage directory; defaults to the platform cache dir
    pub cache_dir: Option<PathBuf>,

    /// User agent override
    pub user_agent: Option<String>,

    /// Network timeout in seconds; unset means no timeout
    pub timeout_secs: Option<u64>,
}

impl HostConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FlixError::config_with_source(format!("cannot read {}", path.display()), e)
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config
            .worker
            .validate()
            .map_err(|e| FlixError::config_with_source("invalid worker config", e))?;
        Ok(config)
    }

    /// Directory for the disk cache.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("fahadflix")
                .join("caches")
        })
    }

    /// Network settings.
    pub fn loader_config(&self) -> LoaderConfig {
        let mut loader = LoaderConfig {
            origin: Some(self.worker.origin.clone()),
            timeout: self.timeout_secs.map(Duration::from_secs),
            ..Default::default()
        };
        if let Some(ua) = &self.user_agent {
            loader.user_agent = ua.clone();
        }
        loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config = HostConfig::from_json("{}").unwrap();
        assert_eq!(config.worker, WorkerConfig::default());
        assert!(config.cache_dir().ends_with("fahadflix/caches"));
        assert!(config.loader_config().timeout.is_none());
    }

    #[test]
    fn test_full_json() {
        let config = HostConfig::from_json(
            r#"{
                "worker": { "origin": "https://flix.example/", "shell_cache": "fahadflix-app-v2" },
                "cache_dir": "/tmp/flix",
                "user_agent": "FlixTest",
                "timeout_secs": 5
            }"#,
        )
        .unwrap();

        assert_eq!(config.worker.shell_cache, "fahadflix-app-v2");
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/flix"));

        let loader = config.loader_config();
        assert_eq!(loader.user_agent, "FlixTest");
        assert_eq!(loader.timeout, Some(Duration::from_secs(5)));
        assert_eq!(loader.origin.unwrap().as_str(), "https://flix.example/");
    }

    #[test]
    fn test_invalid_worker_config() {
        let err = HostConfig::from_json(
            r#"{ "worker": { "shell_cache": "same", "media_cache": "same" } }"#,
        )
        .unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_load_missing_file() {
        let err = HostConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert_eq!(err.category(), "config");
    }
}
