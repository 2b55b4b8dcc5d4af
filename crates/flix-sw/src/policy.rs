//! The cache policy engine.
//!
//! | Route    | Primary                | Secondary            | Both failed                         |
//! |----------|------------------------|----------------------|-------------------------------------|
//! | AppShell | shell namespace        | network, stored      | shell document, else network error  |
//! | Media    | media namespace        | network, stored if ok| 404 "Video unavailable offline"     |
//! | Default  | network (same-origin stored) | shell namespace | shell document / catalog JSON / 503 |

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::WorkerConfig;
use crate::fallback;
use crate::network::Network;
use crate::request::{CacheKey, Request};
use crate::response::{Response, ResponseSource};
use crate::route::{classify, RouteClass};
use crate::storage::CacheStore;
use crate::ServiceWorkerError;

// ==================== Handler Interface ====================

/// What the worker decided for a request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted; the host sends the request to the network as is.
    Passthrough,
    /// Intercepted and answered.
    Respond(Response),
}

impl FetchOutcome {
    /// The response, if the request was intercepted.
    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Respond(response) => Some(response),
        }
    }
}

/// A shell asset that could not be pre-cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFailure {
    pub path: String,
    pub reason: String,
}

/// Result of the install handler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    /// Asset paths now in the shell namespace.
    pub cached: Vec<String>,
    /// Assets that could not be fetched or stored.
    pub failed: Vec<AssetFailure>,
    /// Activate without waiting for open pages to close.
    pub skip_waiting: bool,
}

/// Result of the activate handler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivateReport {
    /// Recognized namespaces left in place.
    pub kept: Vec<String>,
    /// Stale namespaces removed.
    pub deleted: Vec<String>,
    /// Take control of already-open pages now.
    pub claim_clients: bool,
}

/// Lifecycle and fetch handlers, invoked by the host.
#[async_trait]
pub trait WorkerHandler: Send + Sync {
    /// Populate caches before the worker becomes eligible to activate.
    async fn on_install(&self) -> Result<InstallReport, ServiceWorkerError>;

    /// Clean up after a previous version.
    async fn on_activate(&self) -> Result<ActivateReport, ServiceWorkerError>;

    /// Decide a response for an intercepted request.
    async fn on_request(&self, request: Request) -> FetchOutcome;
}

// ==================== Statistics ====================

/// Snapshot of policy counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PolicyStats {
    pub cache_hits: u64,
    pub network_fetches: u64,
    pub network_failures: u64,
    pub stored: u64,
    pub store_failures: u64,
    pub fallbacks: u64,
    pub passthroughs: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicU64,
    network_fetches: AtomicU64,
    network_failures: AtomicU64,
    stored: AtomicU64,
    store_failures: AtomicU64,
    fallbacks: AtomicU64,
    passthroughs: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

// ==================== Cache Policy ====================

/// Routes requests and applies the per-route caching strategy.
pub struct CachePolicy {
    config: WorkerConfig,
    storage: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    counters: Counters,
}

impl CachePolicy {
    /// Create a policy over the given storage and network.
    pub fn new(config: WorkerConfig, storage: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Self {
        Self {
            config,
            storage,
            network,
            counters: Counters::default(),
        }
    }

    /// The worker configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// The storage handle.
    pub fn storage(&self) -> &Arc<dyn CacheStore> {
        &self.storage
    }

    /// Current counters.
    pub fn stats(&self) -> PolicyStats {
        let c = &self.counters;
        PolicyStats {
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            network_fetches: c.network_fetches.load(Ordering::Relaxed),
            network_failures: c.network_failures.load(Ordering::Relaxed),
            stored: c.stored.load(Ordering::Relaxed),
            store_failures: c.store_failures.load(Ordering::Relaxed),
            fallbacks: c.fallbacks.load(Ordering::Relaxed),
            passthroughs: c.passthroughs.load(Ordering::Relaxed),
        }
    }

    /// Cache-first from the shell namespace.
    async fn app_shell(&self, request: &Request) -> Response {
        let key = request.cache_key();
        if let Some(cached) = self.lookup(&self.config.shell_cache, &key).await {
            return cached;
        }

        match self.fetch_network(request).await {
            Ok(response) => {
                self.store(&self.config.shell_cache, key, response.duplicate()).await;
                response
            }
            Err(_) => match self.shell_document().await {
                Some(shell) => shell,
                None => {
                    warn!(url = %request.url, "Shell asset unavailable and no cached shell document");
                    self.fallback(Response::network_error())
                }
            },
        }
    }

    /// Cache-first from the media namespace; only successful responses are stored.
    async fn media(&self, request: &Request) -> Response {
        let key = request.cache_key();
        if let Some(cached) = self.lookup(&self.config.media_cache, &key).await {
            return cached;
        }

        match self.fetch_network(request).await {
            Ok(response) => {
                if response.ok() {
                    self.store(&self.config.media_cache, key, response.duplicate()).await;
                } else {
                    debug!(url = %request.url, status = response.status, "Not caching unsuccessful media response");
                }
                response
            }
            Err(_) => self.fallback(fallback::video_unavailable()),
        }
    }

    /// Network-first, falling back to the shell namespace.
    async fn network_first(&self, request: &Request) -> Response {
        let key = request.cache_key();

        match self.fetch_network(request).await {
            Ok(response) => {
                if self.config.is_same_origin(&request.url) {
                    self.store(&self.config.shell_cache, key, response.duplicate()).await;
                }
                response
            }
            Err(_) => {
                if let Some(cached) = self.lookup(&self.config.shell_cache, &key).await {
                    return cached;
                }
                if request.is_navigation() {
                    if let Some(shell) = self.shell_document().await {
                        return shell;
                    }
                }
                if self.config.is_catalog(&request.url) {
                    return self.fallback(fallback::empty_catalog());
                }
                self.fallback(fallback::offline())
            }
        }
    }

    async fn fetch_network(&self, request: &Request) -> Result<Response, ServiceWorkerError> {
        bump(&self.counters.network_fetches);
        match self.network.fetch(request).await {
            Ok(response) => {
                trace!(url = %request.url, status = response.status, "Network response");
                Ok(response)
            }
            Err(e) => {
                bump(&self.counters.network_failures);
                debug!(url = %request.url, error = %e, "Network fetch failed");
                Err(e)
            }
        }
    }

    /// Cache lookup; storage errors count as a miss.
    async fn lookup(&self, namespace: &str, key: &CacheKey) -> Option<Response> {
        let result = self.storage.match_in(namespace, key).await;
        self.cache_result(namespace, key, result)
    }

    /// Lookup across every namespace, oldest first.
    async fn lookup_any(&self, key: &CacheKey) -> Option<Response> {
        let result = self.storage.match_any(key).await;
        self.cache_result("*", key, result)
    }

    fn cache_result(
        &self,
        namespace: &str,
        key: &CacheKey,
        result: Result<Option<Response>, ServiceWorkerError>,
    ) -> Option<Response> {
        match result {
            Ok(Some(response)) => {
                bump(&self.counters.cache_hits);
                trace!(namespace, key = %key, "Cache hit");
                Some(response.with_source(ResponseSource::Cache))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(namespace, key = %key, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    /// Best-effort write; failures are logged and swallowed.
    async fn store(&self, namespace: &str, key: CacheKey, response: Response) {
        match self.storage.put(namespace, key.clone(), response).await {
            Ok(()) => {
                bump(&self.counters.stored);
                trace!(namespace, key = %key, "Cached response");
            }
            Err(e) => {
                bump(&self.counters.store_failures);
                warn!(namespace, key = %key, error = %e, "Cache put failed");
            }
        }
    }

    async fn shell_document(&self) -> Option<Response> {
        let url = self.config.shell_document_url().ok()?;
        self.lookup_any(&CacheKey::get(&url)).await
    }

    fn fallback(&self, response: Response) -> Response {
        bump(&self.counters.fallbacks);
        response
    }
}

#[async_trait]
impl WorkerHandler for CachePolicy {
    async fn on_install(&self) -> Result<InstallReport, ServiceWorkerError> {
        let namespace = &self.config.shell_cache;
        self.storage.open(namespace).await?;

        let mut report = InstallReport {
            skip_waiting: true,
            ..Default::default()
        };

        for path in &self.config.shell_assets {
            let url = match self.config.resolve(path) {
                Ok(url) => url,
                Err(e) => {
                    report.failed.push(AssetFailure {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let request = Request::get(url);

            let failure = match self.fetch_network(&request).await {
                Ok(response) if response.ok() => {
                    match self.storage.put(namespace, request.cache_key(), response).await {
                        Ok(()) => {
                            bump(&self.counters.stored);
                            None
                        }
                        Err(e) => Some(e.to_string()),
                    }
                }
                Ok(response) => Some(format!("bad status {}", response.status)),
                Err(e) => Some(e.to_string()),
            };

            match failure {
                None => report.cached.push(path.clone()),
                Some(reason) => {
                    warn!(path = %path, reason = %reason, "App shell caching failed");
                    report.failed.push(AssetFailure {
                        path: path.clone(),
                        reason,
                    });
                }
            }
        }

        info!(
            namespace = %namespace,
            cached = report.cached.len(),
            failed = report.failed.len(),
            "Install complete"
        );
        Ok(report)
    }

    async fn on_activate(&self) -> Result<ActivateReport, ServiceWorkerError> {
        let mut report = ActivateReport {
            claim_clients: true,
            ..Default::default()
        };

        for name in self.storage.keys().await? {
            if self.config.is_current(&name) {
                report.kept.push(name);
                continue;
            }
            match self.storage.delete(&name).await {
                Ok(_) => {
                    info!(namespace = %name, "Deleted stale cache");
                    report.deleted.push(name);
                }
                Err(e) => warn!(namespace = %name, error = %e, "Failed to delete stale cache"),
            }
        }

        Ok(report)
    }

    async fn on_request(&self, request: Request) -> FetchOutcome {
        if request.method != Method::GET {
            bump(&self.counters.passthroughs);
            trace!(method = %request.method, url = %request.url, "Bypassing non-GET request");
            return FetchOutcome::Passthrough;
        }

        let route = classify(&request, &self.config);
        debug!(url = %request.url, route = ?route, "Routing request");

        let response = match route {
            RouteClass::AppShell => self.app_shell(&request).await,
            RouteClass::Media => self.media(&request).await,
            RouteClass::Default => self.network_first(&request).await,
        };
        FetchOutcome::Respond(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::MemoryNetwork;
    use crate::request::Destination;
    use crate::response::ResponseType;
    use crate::storage::MemoryCacheStorage;
    use http::{HeaderMap, StatusCode};
    use url::Url;

    const ORIGIN: &str = "https://flix.example/";

    struct Fixture {
        policy: CachePolicy,
        storage: Arc<MemoryCacheStorage>,
        network: Arc<MemoryNetwork>,
    }

    fn fixture() -> Fixture {
        let origin = Url::parse(ORIGIN).unwrap();
        let storage = Arc::new(MemoryCacheStorage::new());
        let network = Arc::new(MemoryNetwork::new().with_origin(origin.clone()));
        let policy = CachePolicy::new(
            WorkerConfig::for_origin(origin),
            storage.clone(),
            network.clone(),
        );
        Fixture {
            policy,
            storage,
            network,
        }
    }

    fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    fn respond(outcome: FetchOutcome) -> Response {
        outcome.into_response().expect("request should be intercepted")
    }

    fn html(body: &'static str) -> Response {
        Response::from_network(
            StatusCode::OK,
            HeaderMap::new(),
            body,
            url("/index.html"),
            ResponseType::Basic,
        )
    }

    #[tokio::test]
    async fn test_non_get_passes_through() {
        let f = fixture();
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD, Method::PATCH] {
            let request = Request::get(url("/index.html")).with_method(method);
            assert!(matches!(
                f.policy.on_request(request).await,
                FetchOutcome::Passthrough
            ));
        }
        assert_eq!(f.network.call_count(), 0);
        assert!(f.storage.keys().await.unwrap().is_empty());
        assert_eq!(f.policy.stats().passthroughs, 5);
    }

    #[tokio::test]
    async fn test_shell_fetched_then_stored() {
        let f = fixture();
        f.network.respond(url("/index.html").as_str(), StatusCode::OK, "text/html", "<html>home</html>");

        let response = respond(f.policy.on_request(Request::get(url("/index.html"))).await);
        assert_eq!(response.status, 200);
        assert_eq!(response.text().unwrap(), "<html>home</html>");
        assert_eq!(response.source, ResponseSource::Network);

        let stored = f.storage.entries("fahadflix-app-v1").await.unwrap();
        assert_eq!(stored, vec![CacheKey::get(&url("/index.html"))]);
    }

    #[tokio::test]
    async fn test_shell_served_from_cache_without_network() {
        let f = fixture();
        f.network.respond(url("/index.html").as_str(), StatusCode::OK, "text/html", "<html>v1</html>");

        respond(f.policy.on_request(Request::get(url("/index.html"))).await);
        assert_eq!(f.network.call_count(), 1);

        f.network.respond(url("/index.html").as_str(), StatusCode::OK, "text/html", "<html>v2</html>");
        let response = respond(f.policy.on_request(Request::get(url("/index.html"))).await);
        assert_eq!(response.text().unwrap(), "<html>v1</html>");
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(f.network.call_count(), 1);
        assert_eq!(f.policy.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_shell_offline_falls_back_to_shell_document() {
        let f = fixture();
        f.storage
            .put("fahadflix-app-v1", CacheKey::get(&url("/index.html")), html("<html>cached</html>"))
            .await
            .unwrap();
        f.network.set_offline(true);

        let response = respond(f.policy.on_request(Request::get(url("/"))).await);
        assert_eq!(response.text().unwrap(), "<html>cached</html>");
    }

    #[tokio::test]
    async fn test_shell_document_found_in_any_namespace() {
        let f = fixture();
        // left behind by a previous version, not yet purged by activation
        f.storage
            .put("fahadflix-app-v0", CacheKey::get(&url("/index.html")), html("<html>v0</html>"))
            .await
            .unwrap();
        f.network.set_offline(true);

        let response = respond(f.policy.on_request(Request::navigate(url("/watch/7"))).await);
        assert_eq!(response.text().unwrap(), "<html>v0</html>");
        assert_eq!(response.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_shell_offline_without_cache_is_network_error() {
        let f = fixture();
        f.network.set_offline(true);

        let response = respond(f.policy.on_request(Request::get(url("/"))).await);
        assert!(response.is_error());
        assert_eq!(f.policy.stats().fallbacks, 1);
    }

    #[tokio::test]
    async fn test_media_offline_uncached() {
        let f = fixture();
        f.network.fail(url("/video/movie1.mp4").as_str());

        let response = respond(f.policy.on_request(Request::get(url("/video/movie1.mp4"))).await);
        assert!(!response.ok());
        assert!(response.status >= 400);
        assert!(response.text().unwrap().contains("unavailable"));
        assert!(f.storage.entries("videos-v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_media_ok_is_cached() {
        let f = fixture();
        let video = url("/video/movie1.mp4");
        f.network.respond(video.as_str(), StatusCode::OK, "video/mp4", vec![0u8, 1, 2, 3]);

        let first = respond(f.policy.on_request(Request::get(video.clone())).await);
        assert_eq!(first.body().as_ref(), &[0, 1, 2, 3]);

        f.network.set_offline(true);
        let second = respond(f.policy.on_request(Request::get(video.clone())).await);
        assert_eq!(second.body().as_ref(), &[0, 1, 2, 3]);
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(f.network.hits(video.as_str()), 1);
    }

    #[tokio::test]
    async fn test_media_error_status_not_cached() {
        let f = fixture();
        let request = Request::get(Url::parse("https://cdn.example/stream/42").unwrap())
            .with_destination(Destination::Video);

        let response = respond(f.policy.on_request(request).await);
        assert_eq!(response.status, 404);
        assert!(f.storage.entries("videos-v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_media_partial_content_not_cached() {
        let f = fixture();
        let video = url("/video/partial.mp4");
        f.network.respond(video.as_str(), StatusCode::PARTIAL_CONTENT, "video/mp4", "chunk");
        f.network.respond(url("/video/ok.webm").as_str(), StatusCode::OK, "video/webm", "full");

        // 206 is not ok(), so never offered to storage
        let partial = respond(f.policy.on_request(Request::get(video)).await);
        assert_eq!(partial.status, 206);

        let full = respond(f.policy.on_request(Request::get(url("/video/ok.webm"))).await);
        assert_eq!(full.text().unwrap(), "full");
        assert_eq!(f.storage.entries("videos-v1").await.unwrap().len(), 1);
        assert_eq!(f.policy.stats().store_failures, 0);
    }

    /// Storage that rejects every write and fails every lookup.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn open(&self, _: &str) -> Result<(), ServiceWorkerError> {
            Ok(())
        }
        async fn match_in(&self, _: &str, _: &CacheKey) -> Result<Option<Response>, ServiceWorkerError> {
            Err(ServiceWorkerError::CacheError("disk unavailable".into()))
        }
        async fn match_any(&self, _: &CacheKey) -> Result<Option<Response>, ServiceWorkerError> {
            Err(ServiceWorkerError::CacheError("disk unavailable".into()))
        }
        async fn put(&self, _: &str, _: CacheKey, _: Response) -> Result<(), ServiceWorkerError> {
            Err(ServiceWorkerError::Unstorable("opaque response".into()))
        }
        async fn keys(&self) -> Result<Vec<String>, ServiceWorkerError> {
            Err(ServiceWorkerError::CacheError("disk unavailable".into()))
        }
        async fn delete(&self, _: &str) -> Result<bool, ServiceWorkerError> {
            Ok(false)
        }
        async fn entries(&self, _: &str) -> Result<Vec<CacheKey>, ServiceWorkerError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_storage_failures_never_fail_requests() {
        let network = Arc::new(MemoryNetwork::new());
        let policy = CachePolicy::new(
            WorkerConfig::for_origin(Url::parse(ORIGIN).unwrap()),
            Arc::new(BrokenStore),
            network.clone(),
        );
        let video = url("/video/movie1.mp4");
        network.respond(video.as_str(), StatusCode::OK, "video/mp4", "frames");

        let response = respond(policy.on_request(Request::get(video)).await);
        assert!(response.ok());
        assert_eq!(response.text().unwrap(), "frames");

        let stats = policy.stats();
        assert_eq!(stats.store_failures, 1);
        assert_eq!(stats.stored, 0);

        // enumeration failure is the one activation error
        assert!(policy.on_activate().await.is_err());
    }

    #[tokio::test]
    async fn test_default_network_first_stores_same_origin() {
        let f = fixture();
        f.network.respond(url("/api/profile").as_str(), StatusCode::OK, "application/json", "{\"v\":1}");

        let response = respond(f.policy.on_request(Request::get(url("/api/profile"))).await);
        assert_eq!(response.text().unwrap(), "{\"v\":1}");
        assert_eq!(f.storage.len("fahadflix-app-v1").await, 1);

        // network-first: a fresh response wins over the cached one
        f.network.respond(url("/api/profile").as_str(), StatusCode::OK, "application/json", "{\"v\":2}");
        let response = respond(f.policy.on_request(Request::get(url("/api/profile"))).await);
        assert_eq!(response.text().unwrap(), "{\"v\":2}");

        f.network.set_offline(true);
        let response = respond(f.policy.on_request(Request::get(url("/api/profile"))).await);
        assert_eq!(response.text().unwrap(), "{\"v\":2}");
        assert_eq!(response.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_default_cross_origin_not_stored() {
        let f = fixture();
        let poster = "https://img.example/posters/1.jpg";
        f.network.respond(poster, StatusCode::OK, "image/jpeg", "jpg");

        respond(f.policy.on_request(Request::get(Url::parse(poster).unwrap())).await);
        assert!(f.storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_offline_generic() {
        let f = fixture();
        f.network.set_offline(true);

        let response = respond(f.policy.on_request(Request::get(url("/api/trending"))).await);
        assert_eq!(response.status, 503);
        assert_eq!(response.text().unwrap(), "Offline");
    }

    #[tokio::test]
    async fn test_default_offline_catalog_is_json() {
        let f = fixture();
        f.network.set_offline(true);

        let response = respond(f.policy.on_request(Request::get(url("/catalog.json"))).await);
        assert!(!response.ok());
        assert_eq!(response.content_type(), Some("application/json"));
        let value: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(value, serde_json::json!({ "movies": [], "shows": [] }));
    }

    #[tokio::test]
    async fn test_default_offline_navigation_gets_shell() {
        let f = fixture();
        f.storage
            .put("fahadflix-app-v1", CacheKey::get(&url("/index.html")), html("<html>app</html>"))
            .await
            .unwrap();
        f.network.set_offline(true);

        let response = respond(f.policy.on_request(Request::navigate(url("/browse/drama"))).await);
        assert_eq!(response.text().unwrap(), "<html>app</html>");

        let response = respond(f.policy.on_request(Request::get(url("/browse/drama"))).await);
        assert_eq!(response.status, 503);
    }

    #[tokio::test]
    async fn test_install_caches_shell_assets() {
        let f = fixture();
        f.network.respond(url("/").as_str(), StatusCode::OK, "text/html", "<html>root</html>");
        f.network.respond(url("/index.html").as_str(), StatusCode::OK, "text/html", "<html>index</html>");

        let report = f.policy.on_install().await.unwrap();
        assert_eq!(report.cached, vec!["/", "/index.html"]);
        assert!(report.failed.is_empty());
        assert!(report.skip_waiting);

        let report = f.policy.on_install().await.unwrap();
        assert_eq!(report.cached.len(), 2);

        let entries = f.storage.entries("fahadflix-app-v1").await.unwrap();
        let mut expected = vec![CacheKey::get(&url("/")), CacheKey::get(&url("/index.html"))];
        expected.sort();
        assert_eq!(entries, expected);
    }

    #[tokio::test]
    async fn test_install_isolates_asset_failures() {
        let f = fixture();
        f.network.respond(url("/index.html").as_str(), StatusCode::OK, "text/html", "<html>index</html>");
        f.network.fail(url("/").as_str());

        let report = f.policy.on_install().await.unwrap();
        assert_eq!(report.cached, vec!["/index.html"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "/");

        assert_eq!(
            f.storage.entries("fahadflix-app-v1").await.unwrap(),
            vec![CacheKey::get(&url("/index.html"))]
        );
    }

    #[tokio::test]
    async fn test_install_offline_still_succeeds() {
        let f = fixture();
        f.network.set_offline(true);

        let report = f.policy.on_install().await.unwrap();
        assert!(report.cached.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(f.storage.has("fahadflix-app-v1").await);
    }

    #[tokio::test]
    async fn test_install_skips_bad_status() {
        let f = fixture();
        f.network.respond(url("/index.html").as_str(), StatusCode::OK, "text/html", "ok");
        // "/" answers 404 from the memory network

        let report = f.policy.on_install().await.unwrap();
        assert_eq!(report.cached, vec!["/index.html"]);
        assert!(report.failed[0].reason.contains("404"));
    }

    #[tokio::test]
    async fn test_activate_purges_stale_namespaces() {
        let f = fixture();
        for name in ["fahadflix-app-v0", "fahadflix-app-v1", "videos-v0", "videos-v1", "misc"] {
            f.storage.open(name).await.unwrap();
        }

        let report = f.policy.on_activate().await.unwrap();
        assert_eq!(report.deleted, vec!["fahadflix-app-v0", "videos-v0", "misc"]);
        assert_eq!(report.kept, vec!["fahadflix-app-v1", "videos-v1"]);
        assert!(report.claim_clients);
        assert_eq!(
            f.storage.keys().await.unwrap(),
            vec!["fahadflix-app-v1", "videos-v1"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_requests_for_same_media() {
        let f = fixture();
        let video = url("/video/popular.m3u8");
        f.network.respond(video.as_str(), StatusCode::OK, "application/vnd.apple.mpegurl", "#EXTM3U");

        let (a, b) = tokio::join!(
            f.policy.on_request(Request::get(video.clone())),
            f.policy.on_request(Request::get(video.clone())),
        );
        assert_eq!(respond(a).text().unwrap(), "#EXTM3U");
        assert_eq!(respond(b).text().unwrap(), "#EXTM3U");
        assert_eq!(f.storage.len("videos-v1").await, 1);
    }
}
