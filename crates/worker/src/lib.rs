//! Offline worker for swcache.
//!
//! This crate provides the request classifier, the per-class caching
//! strategies, the install/activate lifecycle and the network client the
//! host harness drives.

pub mod classify;
pub mod fallback;
pub mod fetch;
pub mod lifecycle;
pub mod policy;
pub mod registration;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use classify::{BypassReason, Disposition, ResourceClass, classify};
pub use fallback::{image_placeholder, offline_response};
pub use fetch::{FetchClient, FetchConfig, Network, fetch_with_timeout};
pub use lifecycle::{ActivateReport, InstallReport, Lifecycle};
pub use policy::CachePolicy;
pub use registration::{LifecycleHost, Registration};
pub use strategy::{Outcome, Source, Strategies};
pub use worker::{EventResult, FetchDisposition, OfflineWorker, WorkerEvent, WorkerState};
