//! # Flix SW
//!
//! Offline worker core for the FahadFlix front end: the request router and
//! cache policy engine that sits between a page and the network.
//!
//! ## Features
//!
//! - **Routing**: every GET is sorted into app-shell, media or default
//! - **Strategies**: cache-first for the shell and media, network-first otherwise
//! - **Fallbacks**: synthesized offline responses, JSON for the catalog
//! - **Lifecycle**: install (pre-cache the shell), activate (purge stale caches)
//! - **Storage**: pluggable cache storage, in memory or on disk
//!
//! ## Architecture
//!
//! ```text
//! host (install / activate / fetch)
//!     │
//!     └── WorkerHandler ── CachePolicy
//!                             ├── classify() → RouteClass
//!                             ├── CacheStore (shell + media namespaces)
//!                             │       └── CacheKey → Response
//!                             └── Network
//! ```

use thiserror::Error;

pub mod config;
pub mod fallback;
pub mod lifecycle;
pub mod network;
pub mod policy;
pub mod request;
pub mod response;
pub mod route;
pub mod storage;

pub use config::WorkerConfig;
pub use lifecycle::{ServiceWorkerId, ServiceWorkerRegistration, ServiceWorkerState};
pub use network::{MemoryNetwork, Network};
pub use policy::{
    ActivateReport, CachePolicy, FetchOutcome, InstallReport, PolicyStats, WorkerHandler,
};
pub use request::{CacheKey, Destination, Request, RequestMode};
pub use response::{Response, ResponseSource, ResponseType};
pub use route::{classify, RouteClass};
pub use storage::{CacheStore, CachedEntry, DiskCacheStorage, MemoryCacheStorage};

// ==================== Errors ====================

/// Errors that can occur in worker operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceWorkerError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Response cannot be stored: {0}")]
    Unstorable(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("State error: {0}")]
    StateError(String),
}

impl ServiceWorkerError {
    /// Whether this error came from the network side.
    pub fn is_network(&self) -> bool {
        matches!(self, ServiceWorkerError::NetworkError(_))
    }
}
