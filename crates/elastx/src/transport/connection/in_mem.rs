//! # Previously, on elastx...
//!
//! 🎬 The cluster was down. Or up. Or half of it was up and the other half was "up" in the
//! way a teenager is "up" at 11am. Someone needed a stand-in that could play every part on cue.
//!
//! `InMemoryConnection` is that stand-in. No sockets, no DNS, no mortgage on the line.
//! Tests tell it which hosts are down and what each path should answer, then read back
//! every attempt it saw: which node, which method, which path, reachable or not.
//! The traceable pool, in RAM, shared behind an `Arc<Mutex<...>>` so the test keeps a clone
//! and the client keeps the other.
//!
//! ⚠️ Not for production. If you're deploying this to prod, please also deploy a therapist. 🦆

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::Mutex;

use super::{Connection, SendError};
use crate::transport::node_pool::NodeAddress;
use crate::transport::request::RequestAttempt;
use crate::transport::response::Response;

/// 📝 One attempt, as witnessed by the in-memory connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAttempt {
    /// 🔑 `host:port` of the node that was tried.
    pub node: String,
    pub method: Method,
    pub path: String,
    pub reachable: bool,
}

#[derive(Debug, Default)]
struct Script {
    down: HashSet<String>,
    responses: HashMap<String, Response>,
}

/// 🎭 A scripted connection: hosts can be taken down and brought back, paths can be given canned answers.
///
/// Unscripted paths answer `200 {}`. Clone-able; clones share the same script and attempt log.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConnection {
    script: Arc<Mutex<Script>>,
    attempts: Arc<Mutex<Vec<RecordedAttempt>>>,
}

impl InMemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 💀 Every attempt against `host:port` now fails as unreachable.
    pub async fn take_down(&self, authority: impl Into<String>) {
        self.script.lock().await.down.insert(authority.into());
    }

    /// ✅ `host:port` answers again.
    pub async fn bring_up(&self, authority: &str) {
        self.script.lock().await.down.remove(authority);
    }

    /// 📬 Answer `path` (e.g. `/_stats`) with this status and body, on every node.
    pub async fn respond(&self, path: impl Into<String>, status: u16, body: impl Into<String>) {
        self.script
            .lock()
            .await
            .responses
            .insert(path.into(), Response::new(status, body));
    }

    /// 📋 Every attempt seen so far, oldest first.
    pub async fn attempts(&self) -> Vec<RecordedAttempt> {
        self.attempts.lock().await.clone()
    }

    pub async fn clear_attempts(&self) {
        self.attempts.lock().await.clear();
    }
}

#[async_trait]
impl Connection for InMemoryConnection {
    async fn send(&self, node: &NodeAddress, request: &RequestAttempt) -> Result<Response, SendError> {
        let authority = node.authority();
        let path = request.path();
        let script = self.script.lock().await;
        let reachable = !script.down.contains(&authority);

        self.attempts.lock().await.push(RecordedAttempt {
            node: authority.clone(),
            method: request.method().clone(),
            path: path.clone(),
            reachable,
        });

        if !reachable {
            return Err(SendError::Unreachable(format!(
                "connection refused: {} is scripted to be down",
                authority
            )));
        }

        Ok(script
            .responses
            .get(&path)
            .cloned()
            .unwrap_or_else(|| Response::new(200, "{}")))
    }
}
