//! The offline worker: lifecycle state plus request routing.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use swcache_core::{CacheStorage, Error, Request};
use tokio::sync::RwLock;

use crate::classify::{BypassReason, Disposition, classify};
use crate::fetch::Network;
use crate::lifecycle::{ActivateReport, InstallReport, Lifecycle};
use crate::policy::CachePolicy;
use crate::registration::LifecycleHost;
use crate::strategy::{Outcome, Strategies};

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Registered, install not yet run
    Parsed,
    Installing,
    /// Precache complete, waiting to activate
    Installed,
    Activating,
    /// Controlling clients and intercepting fetches
    Activated,
    /// Install or activation failed; this worker never controls anything
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Redundant)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        })
    }
}

/// Events delivered by the host.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
}

/// What the worker did with a fetch.
#[derive(Debug, Clone)]
pub enum FetchDisposition {
    /// Not intercepted; the host performs the request itself.
    Passthrough(BypassReason),
    Respond(Outcome),
}

#[derive(Debug, Clone)]
pub enum EventResult {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetch(FetchDisposition),
}

pub struct OfflineWorker {
    policy: Arc<CachePolicy>,
    lifecycle: Lifecycle,
    strategies: Strategies,
    state: RwLock<WorkerState>,
}

impl OfflineWorker {
    pub fn new(
        policy: CachePolicy, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, host: Arc<dyn LifecycleHost>,
        timeout: Duration,
    ) -> Self {
        let policy = Arc::new(policy);
        let lifecycle =
            Lifecycle::new(Arc::clone(&policy), Arc::clone(&storage), Arc::clone(&network), host, timeout);
        let strategies = Strategies::new(Arc::clone(&policy), storage, network, timeout);
        Self { policy, lifecycle, strategies, state: RwLock::new(WorkerState::Parsed) }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub async fn handle_event(&self, event: WorkerEvent) -> Result<EventResult, Error> {
        match event {
            WorkerEvent::Install => self.install().await.map(EventResult::Installed),
            WorkerEvent::Activate => self.activate().await.map(EventResult::Activated),
            WorkerEvent::Fetch(request) => self.handle_fetch(&request).await.map(EventResult::Fetch),
        }
    }

    /// Run the install event.
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` unless the worker is freshly parsed;
    /// `Error::InstallFailed` if precaching fails, after which the worker is
    /// redundant.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing).await?;

        match self.lifecycle.install().await {
            Ok(report) => {
                self.set_state(WorkerState::Installed).await;
                Ok(report)
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    /// Run the activate event.
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` unless install completed.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating).await?;

        match self.lifecycle.activate().await {
            Ok(report) => {
                self.set_state(WorkerState::Activated).await;
                Ok(report)
            }
            Err(e) => {
                tracing::error!("activation failed: {}", e);
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    /// Route one request.
    ///
    /// Requests are passed through until the worker is activated.
    ///
    /// # Errors
    ///
    /// Network failures for classes without an offline fallback.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchDisposition, Error> {
        if !self.state().await.can_intercept_fetch() {
            return Ok(FetchDisposition::Passthrough(BypassReason::Inactive));
        }

        match classify(&self.policy, request) {
            Disposition::Bypass(reason) => {
                tracing::debug!(?reason, url = %request.url, "passing request through");
                Ok(FetchDisposition::Passthrough(reason))
            }
            Disposition::Intercept(class) => {
                tracing::debug!(%class, url = %request.url, "intercepting request");
                self.strategies.respond(class, request).await.map(FetchDisposition::Respond)
            }
        }
    }

    async fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if *state != from {
            return Err(Error::InvalidState(format!("cannot move to {to} from {}, expected {from}", *state)));
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        let mut state = self.state.write().await;
        let from = *state;
        tracing::debug!(%from, %to, "worker state change");
        *state = to;
    }
}
