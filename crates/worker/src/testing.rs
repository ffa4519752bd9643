//! Scripted network for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use swcache_core::{Error, Request, Response};

use crate::fetch::Network;

#[derive(Debug, Clone)]
pub enum Reply {
    Respond(Response),
    Fail,
    Stall,
}

/// Answers by URL path; unscripted paths fail as if offline.
#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, status: u16, body: &str) {
        let response = Response::with_content_type(status, "text/plain", body.to_string());
        self.replies.lock().unwrap().insert(path.to_string(), Reply::Respond(response));
    }

    pub fn fail(&self, path: &str) {
        self.replies.lock().unwrap().insert(path.to_string(), Reply::Fail);
    }

    pub fn stall(&self, path: &str) {
        self.replies.lock().unwrap().insert(path.to_string(), Reply::Stall);
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let path = request.url.path().to_string();
        self.calls.lock().unwrap().push(path.clone());
        let reply = self.replies.lock().unwrap().get(&path).cloned();
        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Stall) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::Network(format!("{} stalled", request.url)))
            }
            Some(Reply::Fail) | None => Err(Error::Network(format!("{} unreachable", request.url))),
        }
    }
}
