//! Host-side lifecycle signals: skip-waiting and client claiming.

use std::collections::BTreeSet;

use async_trait::async_trait;
use swcache_core::Error;
use tokio::sync::RwLock;

/// Lifecycle transition controls provided by the host.
#[async_trait]
pub trait LifecycleHost: Send + Sync {
    /// Let the installed worker activate without waiting for old clients to close.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Take control of every open client; returns how many are now controlled.
    async fn claim_clients(&self) -> Result<usize, Error>;
}

#[derive(Debug, Default)]
struct ClientState {
    open: BTreeSet<String>,
    controlled: BTreeSet<String>,
    skip_waiting: bool,
}

/// Registration record for one worker scope.
///
/// Tracks which pages are open, which of them the worker controls, and
/// whether the worker asked to skip waiting.
#[derive(Debug, Default)]
pub struct Registration {
    state: RwLock<ClientState>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page in scope was opened.
    ///
    /// Pages opened before the worker claims clients stay uncontrolled.
    pub async fn connect(&self, client_id: impl Into<String>) {
        self.state.write().await.open.insert(client_id.into());
    }

    /// A page was closed.
    pub async fn disconnect(&self, client_id: &str) {
        let mut state = self.state.write().await;
        state.open.remove(client_id);
        state.controlled.remove(client_id);
    }

    pub async fn open_clients(&self) -> Vec<String> {
        self.state.read().await.open.iter().cloned().collect()
    }

    pub async fn controlled_clients(&self) -> Vec<String> {
        self.state.read().await.controlled.iter().cloned().collect()
    }

    pub async fn skip_waiting_requested(&self) -> bool {
        self.state.read().await.skip_waiting
    }
}

#[async_trait]
impl LifecycleHost for Registration {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.state.write().await.skip_waiting = true;
        Ok(())
    }

    async fn claim_clients(&self) -> Result<usize, Error> {
        let mut state = self.state.write().await;
        state.controlled = state.open.clone();
        tracing::debug!(clients = state.controlled.len(), "claimed open clients");
        Ok(state.controlled.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_controls_open_clients() {
        let registration = Registration::new();
        registration.connect("tab-1").await;
        registration.connect("tab-2").await;
        assert!(registration.controlled_clients().await.is_empty());

        let claimed = registration.claim_clients().await.unwrap();
        assert_eq!(claimed, 2);
        assert_eq!(registration.controlled_clients().await, vec!["tab-1", "tab-2"]);
    }

    #[tokio::test]
    async fn test_disconnect_releases_control() {
        let registration = Registration::new();
        registration.connect("tab-1").await;
        registration.claim_clients().await.unwrap();

        registration.disconnect("tab-1").await;
        assert!(registration.open_clients().await.is_empty());
        assert!(registration.controlled_clients().await.is_empty());
    }

    #[tokio::test]
    async fn test_skip_waiting_flag() {
        let registration = Registration::new();
        assert!(!registration.skip_waiting_requested().await);
        registration.skip_waiting().await.unwrap();
        assert!(registration.skip_waiting_requested().await);
    }
}
