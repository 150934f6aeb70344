//! Offline-first reconciliation between the local cache and the remote store.

pub mod engine;
pub mod history;
pub mod policy;
pub mod profile;
pub mod setup;

pub use engine::SyncEngine;
pub use history::HistoryReconciler;
pub use policy::{BestEffort, RemoteFailure, SyncOp};
pub use profile::ProfileReconciler;
pub use setup::{build_remote, store_credentials, stored_credentials};
