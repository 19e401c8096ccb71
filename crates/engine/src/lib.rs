//! Alert matching and access control engine.
//!
//! Everything here follows one mutation discipline: take the store
//! lock, load the full document, compute, save the full document. There
//! is no partial update and no cross-store transaction; the persisted
//! JSON files are the only shared state between the command handlers
//! and the evaluation loop.

pub mod access;
pub mod alerts;
pub mod error;
pub mod notify;
pub mod registry;
pub mod store;
pub mod watcher;

pub use access::{
    AccessControl, AccessOverview, AccountSummary, RequestAccessOutcome, RequestCoinOutcome,
};
pub use alerts::AlertService;
pub use error::EngineError;
pub use notify::{Notify, NotifyError};
pub use registry::AssetRegistry;
pub use store::{JsonStore, StoreError};
pub use watcher::{CycleReport, PriceWatcher, WatcherConfig};

#[cfg(test)]
pub(crate) mod testutil;
