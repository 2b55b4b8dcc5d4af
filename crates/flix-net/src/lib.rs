//! # Flix Net
//!
//! Network backends for the FahadFlix offline worker.
//!
//! - [`HttpNetwork`]: real HTTP via `reqwest`
//! - [`OfflineNetwork`]: every fetch fails, for exercising offline paths

use std::time::Duration;

use async_trait::async_trait;
use flix_sw::{Network, Request, RequestMode, Response, ResponseType, ServiceWorkerError};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, trace};
use url::Url;

/// Errors that can occur in networking.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Offline")]
    Offline,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl From<NetError> for ServiceWorkerError {
    fn from(e: NetError) -> Self {
        ServiceWorkerError::NetworkError(e.to_string())
    }
}

/// Network configuration.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// User agent string.
    pub user_agent: String,
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Maximum redirects.
    pub max_redirects: usize,
    /// Origin whose responses are `Basic` rather than `Cors`.
    pub origin: Option<Url>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("FlixSW/{}", env!("CARGO_PKG_VERSION")),
            timeout: None,
            max_redirects: 10,
            origin: None,
        }
    }
}

/// `reqwest`-backed network.
pub struct HttpNetwork {
    client: Client,
    config: LoaderConfig,
}

impl HttpNetwork {
    /// Create a new network.
    pub fn new(config: LoaderConfig) -> Result<Self, NetError> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| NetError::RequestFailed(e.to_string()))?;

        info!(origin = ?config.origin.as_ref().map(Url::as_str), "HttpNetwork initialized");

        Ok(Self { client, config })
    }

    /// The configuration in use.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn response_type(&self, request: &Request, final_url: &Url) -> ResponseType {
        let same_origin = self
            .config
            .origin
            .as_ref()
            .is_some_and(|o| o.origin() == final_url.origin());
        match (same_origin, request.mode) {
            (true, _) => ResponseType::Basic,
            (false, RequestMode::NoCors) => ResponseType::Opaque,
            (false, _) => ResponseType::Cors,
        }
    }

    async fn send(&self, request: &Request) -> Result<Response, NetError> {
        debug!(url = %request.url, method = %request.method, "Fetching resource");

        let mut req_builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.clone());
        }

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                NetError::Timeout(self.config.timeout.unwrap_or_default())
            } else {
                NetError::HttpError(e)
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;

        trace!(
            url = %url,
            status = %status,
            body_len = body.len(),
            "Response received"
        );

        let response_type = self.response_type(request, &url);
        Ok(Response::from_network(status, headers, body, url, response_type))
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, ServiceWorkerError> {
        Ok(self.send(request).await?)
    }
}

/// A network that is never reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineNetwork;

#[async_trait]
impl Network for OfflineNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, ServiceWorkerError> {
        trace!(url = %request.url, "Offline network refused request");
        Err(NetError::Offline.into())
    }
}
