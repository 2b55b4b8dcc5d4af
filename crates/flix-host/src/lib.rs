//! # Flix Host
//!
//! The thin host shim around the offline worker: it owns the worker's
//! lifecycle, the open pages, and the raw network, and turns host events
//! (install, activate, fetch) into calls on a [`flix_sw::WorkerHandler`].

pub mod clients;
pub mod config;
pub mod host;

pub use clients::{Client, Clients};
pub use config::HostConfig;
pub use host::{HostEvent, WorkerHost};
