//! Worker host.
//!
//! Drives one [`ServiceWorkerRegistration`] through install and activate,
//! and routes fetches either through the active worker or straight to the
//! network.

use std::sync::Arc;

use flix_common::{FlixError, Result};
use flix_sw::{
    ActivateReport, FetchOutcome, InstallReport, Network, Request, Response, ResponseSource,
    ServiceWorkerId, ServiceWorkerRegistration, ServiceWorkerState, WorkerHandler,
};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::clients::{Client, Clients};

/// Events emitted by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A worker version changed state.
    StateChange {
        worker: ServiceWorkerId,
        state: ServiceWorkerState,
    },
    /// A client got a new controller.
    ControllerChange {
        client_id: String,
        worker: ServiceWorkerId,
    },
    /// A fetch completed.
    Fetch {
        url: Url,
        intercepted: bool,
        status: u16,
        source: ResponseSource,
    },
}

/// Owns the registration, the handler, the raw network and open clients.
pub struct WorkerHost {
    registration: RwLock<ServiceWorkerRegistration>,
    handler: Arc<dyn WorkerHandler>,
    network: Arc<dyn Network>,
    clients: RwLock<Clients>,
    events: mpsc::UnboundedSender<HostEvent>,
}

impl WorkerHost {
    /// Create a host for `scope`. The receiver yields [`HostEvent`]s.
    pub fn new(
        scope: Url,
        handler: Arc<dyn WorkerHandler>,
        network: Arc<dyn Network>,
    ) -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let host = Self {
            registration: RwLock::new(ServiceWorkerRegistration::new(scope)),
            handler,
            network,
            clients: RwLock::new(Clients::new()),
            events,
        };
        (host, rx)
    }

    fn emit(&self, event: HostEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn state_change(&self, worker: ServiceWorkerId, state: ServiceWorkerState) {
        debug!(worker = worker.raw(), ?state, "Worker state change");
        self.emit(HostEvent::StateChange { worker, state });
    }

    /// Install a new worker version.
    ///
    /// On success the worker waits in `Installed`; on failure it becomes
    /// `Redundant` and the error is returned.
    pub async fn install(&self) -> Result<InstallReport> {
        let id = self.registration.write().await.begin_install();
        self.state_change(id, ServiceWorkerState::Installing);

        match self.handler.on_install().await {
            Ok(report) => {
                self.registration
                    .write()
                    .await
                    .install_complete()
                    .map_err(|e| FlixError::worker_with_source("install", e))?;
                self.state_change(id, ServiceWorkerState::Installed);
                info!(
                    worker = id.raw(),
                    cached = report.cached.len(),
                    failed = report.failed.len(),
                    "Worker installed"
                );
                Ok(report)
            }
            Err(e) => {
                if let Some(id) = self.registration.write().await.fail_install() {
                    self.state_change(id, ServiceWorkerState::Redundant);
                }
                warn!(worker = id.raw(), error = %e, "Worker install failed");
                Err(FlixError::worker_with_source("install handler failed", e))
            }
        }
    }

    /// Activate the waiting worker.
    ///
    /// When the handler asks to claim clients, every open client in scope
    /// becomes controlled.
    pub async fn activate(&self) -> Result<ActivateReport> {
        let id = self
            .registration
            .write()
            .await
            .begin_activate()
            .map_err(|e| FlixError::worker_with_source("activate", e))?;
        self.state_change(id, ServiceWorkerState::Activating);

        let report = match self.handler.on_activate().await {
            Ok(report) => report,
            Err(e) => {
                if let Some(id) = self.registration.write().await.fail_activate() {
                    self.state_change(id, ServiceWorkerState::Redundant);
                }
                warn!(worker = id.raw(), error = %e, "Worker activate failed");
                return Err(FlixError::worker_with_source("activate handler failed", e));
            }
        };

        let scope = {
            let mut registration = self.registration.write().await;
            let previous = registration.get_active().map(|w| w.id);
            registration
                .activate()
                .map_err(|e| FlixError::worker_with_source("activate", e))?;
            if let Some(previous) = previous {
                self.state_change(previous, ServiceWorkerState::Redundant);
            }
            registration.scope.clone()
        };
        self.state_change(id, ServiceWorkerState::Activated);
        info!(
            worker = id.raw(),
            deleted = report.deleted.len(),
            "Worker activated"
        );

        if report.claim_clients {
            let claimed = self.clients.write().await.claim(id, &scope);
            for client_id in claimed {
                self.emit(HostEvent::ControllerChange {
                    client_id,
                    worker: id,
                });
            }
        }

        Ok(report)
    }

    /// Install, then activate right away if the handler asks to skip waiting.
    pub async fn start(&self) -> Result<(InstallReport, Option<ActivateReport>)> {
        let install = self.install().await?;
        let activate = if install.skip_waiting {
            Some(self.activate().await?)
        } else {
            None
        };
        Ok((install, activate))
    }

    /// Fetch on behalf of the host itself.
    ///
    /// Intercepted when a worker is active; otherwise the request goes to
    /// the network untouched.
    pub async fn fetch(&self, request: Request) -> Result<Response> {
        let intercept = self.registration.read().await.is_controlling();
        self.dispatch(request, intercept).await
    }

    /// Fetch on behalf of an open page.
    ///
    /// Navigations are intercepted by any active worker. Subresources are
    /// only intercepted once the page is controlled.
    pub async fn fetch_from(&self, client_id: &str, request: Request) -> Result<Response> {
        let active = self.registration.read().await.is_controlling();
        let intercept = active
            && (request.is_navigation() || self.clients.read().await.is_controlled(client_id));
        self.dispatch(request, intercept).await
    }

    async fn dispatch(&self, request: Request, intercept: bool) -> Result<Response> {
        let url = request.url.clone();

        let (response, intercepted) = if intercept {
            match self.handler.on_request(request.clone()).await {
                FetchOutcome::Respond(response) => (response, true),
                FetchOutcome::Passthrough => (self.passthrough(&request).await?, false),
            }
        } else {
            (self.passthrough(&request).await?, false)
        };

        self.emit(HostEvent::Fetch {
            url,
            intercepted,
            status: response.status,
            source: response.source,
        });
        Ok(response)
    }

    async fn passthrough(&self, request: &Request) -> Result<Response> {
        self.network
            .fetch(request)
            .await
            .map_err(|e| FlixError::network_with_source(format!("fetch {}", request.url), e))
    }

    /// Open a page. A page opened in scope while a worker is active is
    /// controlled from the start.
    pub async fn open_window(&self, url: Url) -> Client {
        let (active, scope) = {
            let registration = self.registration.read().await;
            let active = registration
                .get_active()
                .filter(|w| w.state.can_intercept())
                .map(|w| w.id);
            (active, registration.scope.clone())
        };

        let mut clients = self.clients.write().await;
        let mut client = clients.open_window(url);
        if let Some(worker) = active {
            if client.url.as_str().starts_with(scope.as_str()) {
                clients.set_controller(&client.id, worker);
                client.controller = Some(worker);
            }
        }
        client
    }

    /// Snapshot of a client.
    pub async fn client(&self, id: &str) -> Option<Client> {
        self.clients.read().await.get(id).cloned()
    }

    /// Clients controlled by the active worker.
    pub async fn controlled_clients(&self) -> Vec<Client> {
        let Some(active) = self.active_worker().await else {
            return Vec::new();
        };
        self.clients
            .read()
            .await
            .controlled(active)
            .into_iter()
            .cloned()
            .collect()
    }

    /// The active worker, if any.
    pub async fn active_worker(&self) -> Option<ServiceWorkerId> {
        self.registration.read().await.get_active().map(|w| w.id)
    }

    /// State of the newest worker version.
    pub async fn state(&self) -> Option<ServiceWorkerState> {
        let registration = self.registration.read().await;
        registration
            .installing
            .as_ref()
            .or(registration.waiting.as_ref())
            .or(registration.active.as_ref())
            .map(|w| w.state)
    }
}
