//! sw_install and sw_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;
use swcache_worker::{ActivateReport, InstallReport, WorkerState};

use crate::host::Host;
use crate::tools::json_result;

#[derive(Debug, Clone, Serialize)]
pub struct InstallOutput {
    pub state: WorkerState,
    #[serde(flatten)]
    pub report: InstallReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivateOutput {
    pub state: WorkerState,
    #[serde(flatten)]
    pub report: ActivateReport,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(host: &Host) -> Result<CallToolResult, McpError> {
    let report = host.worker.install().await?;
    let output = InstallOutput { state: host.worker.state().await, report };
    json_result(&output)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(host: &Host) -> Result<CallToolResult, McpError> {
    let report = host.worker.activate().await?;
    let output = ActivateOutput { state: host.worker.state().await, report };
    json_result(&output)
}
