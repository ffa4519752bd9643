//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server.

pub mod cache;
pub mod lifecycle;
pub mod status;
pub mod sw_fetch;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use swcache_core::{Error, Response};

pub use lifecycle::{activate_impl, install_impl};
pub use status::status_impl;
pub use sw_fetch::{SwFetchParams, fetch_impl};

/// A response as returned to the MCP client.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub body_bytes: usize,
}

impl From<&Response> for ResponseView {
    fn from(response: &Response) -> Self {
        Self {
            status: response.status,
            content_type: response.content_type().map(String::from),
            headers: response.headers.clone(),
            body: response.text(),
            body_bytes: response.body.len(),
        }
    }
}

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use swcache_core::{Error, MemoryStorage, Request, Response};
    use swcache_worker::{CachePolicy, Network};

    use crate::host::Host;

    /// Serves a text body for every path, or fails everything when offline.
    pub struct EchoNetwork {
        pub online: bool,
    }

    #[async_trait]
    impl Network for EchoNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            if !self.online {
                return Err(Error::Network(format!("{} unreachable", request.url)));
            }
            Ok(Response::with_content_type(200, "text/plain", format!("body of {}", request.url.path())))
        }
    }

    pub fn host(online: bool) -> Host {
        let policy = CachePolicy::new("https://folio.dev").unwrap().with_manifest(["/", "/favicon.ico"]).unwrap();
        Host::new(
            policy,
            Arc::new(MemoryStorage::new()),
            Arc::new(EchoNetwork { online }),
            Duration::from_secs(1),
        )
    }
}
