//! 🔌 Connections: the thing that actually puts one request on one node.
//!
//! 🎭 Same casting agency as always: a trait, a couple of concrete actors, and an enum that
//! dispatches to whoever got the part. The transport never knows whether it is talking to a
//! real cluster over reqwest or to a scripted stand-in that lives entirely in RAM.
//!
//! The one job a connection has beyond sending: telling the transport *why* a send failed.
//! [`SendError::Unreachable`] means "try another node". [`SendError::Fatal`] means "stop,
//! another node won't help". 🦆

use async_trait::async_trait;

use super::node_pool::NodeAddress;
use super::request::RequestAttempt;
use super::response::Response;
use crate::error::ElastxError;

pub mod http;
pub mod in_mem;

pub use http::HttpConnection;
pub use in_mem::{InMemoryConnection, RecordedAttempt};

/// 💔 Why a send did not produce a response.
#[derive(Debug)]
pub enum SendError {
    /// 📡 Refused, timed out, DNS said no. The node is the problem; try the next one.
    Unreachable(String),
    /// 💀 The request itself is the problem. Retrying elsewhere just repeats the mistake.
    Fatal(ElastxError),
}

/// 🔌 Sends one [`RequestAttempt`] to one node.
///
/// # Contract
/// - Any HTTP response, whatever its status, is `Ok`. The node answered; it is alive.
/// - Connection-level failures are `Err(SendError::Unreachable)`.
/// - Everything else is `Err(SendError::Fatal)`.
#[async_trait]
pub trait Connection: std::fmt::Debug {
    async fn send(&self, node: &NodeAddress, request: &RequestAttempt) -> Result<Response, SendError>;
}

/// 🎭 The many faces of a Connection.
#[derive(Debug)]
pub enum ConnectionBackend {
    Http(HttpConnection),
    InMemory(InMemoryConnection),
}

#[async_trait]
impl Connection for ConnectionBackend {
    async fn send(&self, node: &NodeAddress, request: &RequestAttempt) -> Result<Response, SendError> {
        match self {
            ConnectionBackend::Http(conn) => conn.send(node, request).await,
            ConnectionBackend::InMemory(conn) => conn.send(node, request).await,
        }
    }
}

impl From<HttpConnection> for ConnectionBackend {
    fn from(conn: HttpConnection) -> Self {
        ConnectionBackend::Http(conn)
    }
}

impl From<InMemoryConnection> for ConnectionBackend {
    fn from(conn: InMemoryConnection) -> Self {
        ConnectionBackend::InMemory(conn)
    }
}
