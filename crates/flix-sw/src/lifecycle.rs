//! Worker lifecycle state.
//!
//! ```text
//! Parsed → Installing → Installed → Activating → Activated
//!              │                                    │
//!              └──────────────► Redundant ◄─────────┘ (replaced)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ServiceWorkerError;

/// Unique identifier for a worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ServiceWorkerId(u64);

impl ServiceWorkerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceWorkerState {
    /// Created, not yet installing.
    #[default]
    Parsed,
    /// Install handler running.
    Installing,
    /// Installed, waiting for activation.
    Installed,
    /// Activate handler running.
    Activating,
    /// Active and allowed to intercept requests.
    Activated,
    /// Install failed or replaced by a newer version.
    Redundant,
}

impl ServiceWorkerState {
    /// Check if this state allows request interception.
    pub fn can_intercept(&self) -> bool {
        matches!(self, ServiceWorkerState::Activated)
    }
}

/// One worker version.
#[derive(Debug, Clone)]
pub struct ServiceWorker {
    /// Unique ID.
    pub id: ServiceWorkerId,

    /// Current state.
    pub state: ServiceWorkerState,

    /// Time of last state change.
    pub state_changed_at: Instant,
}

impl ServiceWorker {
    fn new() -> Self {
        Self {
            id: ServiceWorkerId::new(),
            state: ServiceWorkerState::Parsed,
            state_changed_at: Instant::now(),
        }
    }

    fn set_state(&mut self, state: ServiceWorkerState) {
        self.state = state;
        self.state_changed_at = Instant::now();
    }
}

/// The installing / waiting / active slots for one scope.
#[derive(Debug)]
pub struct ServiceWorkerRegistration {
    /// Scope URL.
    pub scope: Url,

    /// Installing worker.
    pub installing: Option<ServiceWorker>,

    /// Waiting worker (installed but not active).
    pub waiting: Option<ServiceWorker>,

    /// Active worker.
    pub active: Option<ServiceWorker>,
}

impl ServiceWorkerRegistration {
    /// Create an empty registration.
    pub fn new(scope: Url) -> Self {
        Self {
            scope,
            installing: None,
            waiting: None,
            active: None,
        }
    }

    /// Start installing a new worker version.
    pub fn begin_install(&mut self) -> ServiceWorkerId {
        let mut worker = ServiceWorker::new();
        worker.set_state(ServiceWorkerState::Installing);
        let id = worker.id;
        if let Some(mut previous) = self.installing.replace(worker) {
            previous.set_state(ServiceWorkerState::Redundant);
        }
        id
    }

    /// Transition installing to waiting.
    pub fn install_complete(&mut self) -> Result<ServiceWorkerId, ServiceWorkerError> {
        let mut worker = self
            .installing
            .take()
            .ok_or_else(|| ServiceWorkerError::StateError("no installing worker".to_string()))?;
        worker.set_state(ServiceWorkerState::Installed);
        let id = worker.id;
        if let Some(mut old) = self.waiting.replace(worker) {
            old.set_state(ServiceWorkerState::Redundant);
        }
        Ok(id)
    }

    /// Discard the installing worker after a failed install.
    pub fn fail_install(&mut self) -> Option<ServiceWorkerId> {
        self.installing.take().map(|mut worker| {
            worker.set_state(ServiceWorkerState::Redundant);
            worker.id
        })
    }

    /// Move the waiting worker into the activating state.
    pub fn begin_activate(&mut self) -> Result<ServiceWorkerId, ServiceWorkerError> {
        let worker = self
            .waiting
            .as_mut()
            .ok_or_else(|| ServiceWorkerError::StateError("no waiting worker".to_string()))?;
        worker.set_state(ServiceWorkerState::Activating);
        Ok(worker.id)
    }

    /// Promote the waiting worker to active, retiring the old one.
    pub fn activate(&mut self) -> Result<ServiceWorkerId, ServiceWorkerError> {
        let mut worker = self
            .waiting
            .take()
            .ok_or_else(|| ServiceWorkerError::StateError("no waiting worker".to_string()))?;

        if let Some(mut old) = self.active.take() {
            old.set_state(ServiceWorkerState::Redundant);
        }

        worker.set_state(ServiceWorkerState::Activated);
        let id = worker.id;
        self.active = Some(worker);
        Ok(id)
    }

    /// Discard the waiting worker after a failed activate handler.
    pub fn fail_activate(&mut self) -> Option<ServiceWorkerId> {
        self.waiting.take().map(|mut worker| {
            worker.set_state(ServiceWorkerState::Redundant);
            worker.id
        })
    }

    /// Skip waiting (force activate).
    pub fn skip_waiting(&mut self) -> Result<ServiceWorkerId, ServiceWorkerError> {
        self.begin_activate()?;
        self.activate()
    }

    /// Get the active worker.
    pub fn get_active(&self) -> Option<&ServiceWorker> {
        self.active.as_ref()
    }

    /// Check if some worker may intercept requests.
    pub fn is_controlling(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|w| w.state.can_intercept())
    }
}
