//! sw_fetch tool implementation.
//!
//! Dispatches one request through the worker. Requests the worker does not
//! intercept are fetched directly, the way a page would without a worker.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{Destination, Error, Method, Request, RequestMode};
use swcache_worker::fetch::resolve;
use swcache_worker::{BypassReason, FetchDisposition, ResourceClass, Source, fetch_with_timeout};

use crate::host::Host;
use crate::tools::{ResponseView, json_result};

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the site origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Fetch destination, e.g. "image" or "document" (default: none).
    #[serde(default)]
    pub destination: String,

    /// Request mode: "navigate", "same-origin", "no-cors" or "cors" (default).
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Page issuing the request; registered as an open client.
    #[serde(default)]
    pub client_id: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

fn default_mode() -> String {
    "cors".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwFetchOutput {
    pub url: String,
    pub intercepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<ResourceClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_reason: Option<BypassReason>,
    pub response: ResponseView,
}

impl SwFetchParams {
    fn to_request(&self, host: &Host) -> Result<Request, Error> {
        Ok(Request {
            method: self.method.parse::<Method>()?,
            url: resolve(host.worker.policy().origin(), &self.url)?,
            destination: self.destination.parse::<Destination>()?,
            mode: self.mode.parse::<RequestMode>()?,
        })
    }
}

pub async fn dispatch(host: &Host, params: SwFetchParams) -> Result<SwFetchOutput, Error> {
    let request = params.to_request(host)?;
    if let Some(client_id) = params.client_id {
        host.registration.connect(client_id).await;
    }

    let output = match host.worker.handle_fetch(&request).await? {
        FetchDisposition::Respond(outcome) => SwFetchOutput {
            url: request.url.to_string(),
            intercepted: true,
            class: Some(outcome.class),
            source: Some(outcome.source),
            bypass_reason: None,
            response: ResponseView::from(&outcome.response),
        },
        FetchDisposition::Passthrough(reason) => {
            let response = fetch_with_timeout(host.network.as_ref(), &request, host.timeout).await?;
            SwFetchOutput {
                url: request.url.to_string(),
                intercepted: false,
                class: None,
                source: None,
                bypass_reason: Some(reason),
                response: ResponseView::from(&response),
            }
        }
    };

    Ok(output)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(host: &Host, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }
    let output = dispatch(host, params).await?;
    json_result(&output)
}
