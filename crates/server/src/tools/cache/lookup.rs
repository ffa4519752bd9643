//! cache_match tool implementation.
//!
//! Looks a URL up in one partition, or across all of them in creation order.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{Error, Request};
use swcache_worker::fetch::resolve;

use crate::host::Host;
use crate::tools::{ResponseView, json_result};

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path resolved against the site origin.
    pub url: String,

    /// Partition to search; every partition when omitted.
    #[serde(default)]
    pub partition: Option<String>,
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheMatchOutput {
    pub url: String,
    /// Partition that answered.
    pub partition: String,
    pub response: ResponseView,
}

pub async fn lookup(host: &Host, params: CacheMatchParams) -> Result<CacheMatchOutput, Error> {
    let url = resolve(host.worker.policy().origin(), &params.url)?;
    let request = Request::get(url);

    let hit = match params.partition {
        Some(partition) => host
            .storage
            .match_in(&partition, &request)
            .await?
            .map(|response| (partition, response)),
        None => host.storage.match_any(&request).await?,
    };

    let (partition, response) = hit.ok_or_else(|| Error::CacheMiss(request.url.to_string()))?;
    Ok(CacheMatchOutput { url: request.url.to_string(), partition, response: ResponseView::from(&response) })
}

/// Implementation of the cache_match tool.
pub async fn match_impl(host: &Host, params: CacheMatchParams) -> Result<CallToolResult, McpError> {
    let output = lookup(host, params).await?;
    json_result(&output)
}
