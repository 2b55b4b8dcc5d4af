//! # Flix Common
//!
//! Shared error types and logging configuration for the FahadFlix offline worker.
//!
//! ## Features
//!
//! - Unified application error type
//! - Logging configuration and setup

use thiserror::Error;

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for the worker host and its tooling.
#[derive(Error, Debug)]
pub enum FlixError {
    /// A passthrough fetch got no response at all.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: BoxError,
    },

    /// Install or activate failed, or was called in the wrong state.
    #[error("Worker error: {message}")]
    Worker {
        message: String,
        #[source]
        source: BoxError,
    },

    /// Configuration could not be read or is invalid.
    #[error("Config error: {message}")]
    Config {
        message: String,
        #[source]
        source: BoxError,
    },

    /// Malformed JSON configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlixError {
    pub fn network_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Box::new(source),
        }
    }

    pub fn worker_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Worker {
            message: message.into(),
            source: Box::new(source),
        }
    }

    pub fn config_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Short name for the `category` log field.
    pub fn category(&self) -> &'static str {
        match self {
            FlixError::Network { .. } => "network",
            FlixError::Worker { .. } => "worker",
            FlixError::Config { .. } | FlixError::Json(_) => "config",
        }
    }
}

/// Result type alias for host operations.
pub type Result<T> = std::result::Result<T, FlixError>;
