//! Open pages and which worker controls them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use flix_sw::ServiceWorkerId;
use url::Url;

/// An open page.
#[derive(Debug, Clone)]
pub struct Client {
    /// Client ID.
    pub id: String,

    /// Client URL.
    pub url: Url,

    /// Worker controlling this client, if any.
    pub controller: Option<ServiceWorkerId>,
}

/// Clients registry.
#[derive(Debug, Default)]
pub struct Clients {
    clients: HashMap<String, Client>,
}

impl Clients {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a window. New windows start uncontrolled.
    pub fn open_window(&mut self, url: Url) -> Client {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let id = format!("client-{}", COUNTER.fetch_add(1, Ordering::Relaxed));
        let client = Client {
            id: id.clone(),
            url,
            controller: None,
        };
        self.clients.insert(id, client.clone());
        client
    }

    /// Get a client by ID.
    pub fn get(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Check if a client is controlled by any worker.
    pub fn is_controlled(&self, id: &str) -> bool {
        self.clients
            .get(id)
            .is_some_and(|c| c.controller.is_some())
    }

    /// Make `worker` the controller of every client in `scope`.
    ///
    /// Returns the IDs whose controller changed.
    pub fn claim(&mut self, worker: ServiceWorkerId, scope: &Url) -> Vec<String> {
        let mut changed: Vec<String> = self
            .clients
            .values_mut()
            .filter(|c| c.url.as_str().starts_with(scope.as_str()))
            .filter(|c| c.controller != Some(worker))
            .map(|c| {
                c.controller = Some(worker);
                c.id.clone()
            })
            .collect();
        changed.sort();
        changed
    }

    /// Set the controller of a single client.
    pub fn set_controller(&mut self, id: &str, worker: ServiceWorkerId) -> bool {
        match self.clients.get_mut(id) {
            Some(client) => {
                client.controller = Some(worker);
                true
            }
            None => false,
        }
    }

    /// Clients controlled by `worker`.
    pub fn controlled(&self, worker: ServiceWorkerId) -> Vec<&Client> {
        self.clients
            .values()
            .filter(|c| c.controller == Some(worker))
            .collect()
    }
}
