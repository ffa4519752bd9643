//! sw_status tool implementation.
//!
//! Reports worker state, partitions with entry counts and client control.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;
use swcache_core::Error;
use swcache_worker::WorkerState;

use crate::host::Host;
use crate::tools::json_result;

#[derive(Debug, Clone, Serialize)]
pub struct PartitionStatus {
    pub name: String,
    pub entries: usize,
    /// Belongs to the running cache version.
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    pub state: WorkerState,
    pub cache_version: String,
    pub partitions: Vec<PartitionStatus>,
    pub open_clients: Vec<String>,
    pub controlled_clients: Vec<String>,
    pub skip_waiting: bool,
}

pub async fn status(host: &Host) -> Result<StatusOutput, Error> {
    let policy = host.worker.policy();

    let mut partitions = Vec::new();
    for name in host.storage.keys().await? {
        let entries = host.storage.entry_count(&name).await?;
        let current = policy.is_current_partition(&name);
        partitions.push(PartitionStatus { name, entries, current });
    }

    Ok(StatusOutput {
        state: host.worker.state().await,
        cache_version: policy.cache_version().to_string(),
        partitions,
        open_clients: host.registration.open_clients().await,
        controlled_clients: host.registration.controlled_clients().await,
        skip_waiting: host.registration.skip_waiting_requested().await,
    })
}

/// Implementation of the sw_status tool.
pub async fn status_impl(host: &Host) -> Result<CallToolResult, McpError> {
    let output = status(host).await?;
    json_result(&output)
}
