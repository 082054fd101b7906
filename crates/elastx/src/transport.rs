//! # 🚚 THE TRANSPORT
//!
//! 🎬 COLD OPEN. INT. ON-CALL LAPTOP, 3:47 AM
//!
//! Node one is refusing connections. Node two is "thinking about it". Node three, bless it,
//! is answering. The transport does not panic. The transport asks the pool for a name,
//! knocks, and if nobody opens, crosses the name off and asks for the next one.
//!
//! That is the whole algorithm. It's a linear retry loop, not a backoff scheduler:
//! - pick a node from the [`NodePool`]
//! - send through the [`Connection`]
//! - answered (any status)? mark alive, done
//! - unreachable? mark dead, try the next one
//! - budget is one attempt per configured node; spend it all and you get
//!   [`ElastxError::NoNodeAvailable`]
//!
//! No sleeping between attempts. No circuit breaker beyond the dead/alive flag. 🦆

use serde::Deserialize;
use tracing::{debug, info, trace, warn};

use crate::error::{ElastxError, Result};

pub mod connection;
pub mod node_pool;
pub mod request;
pub mod response;

pub use connection::{
    Connection, ConnectionBackend, HttpConnection, InMemoryConnection, RecordedAttempt, SendError,
};
pub use node_pool::{
    ExhaustionPolicy, Liveness, Node, NodeAddress, NodeId, NodePool, SelectionPolicy,
};
pub use request::{RequestAttempt, RequestBody};
pub use response::Response;

/// 🔧 Transport knobs. Timeouts are handed straight to the HTTP client.
#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    /// ⏱️ How long to wait for a TCP handshake before calling the node unreachable.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// ⏱️ Whole-request timeout, body included.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub selection: SelectionPolicy,
    #[serde(default)]
    pub exhaustion: ExhaustionPolicy,
    /// 🔒 Basic auth username.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// 🔒 API key; wins over basic auth when both are set.
    #[serde(default)]
    pub api_key: Option<String>,
}

// ⏱️ 10s to shake hands. If a node can't manage that, it's not having a good time.
fn default_connect_timeout_ms() -> u64 {
    10_000
}

// ⏱️ 30s for the whole round trip. Bulk requests can be meaty.
fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            timeout_ms: default_timeout_ms(),
            selection: SelectionPolicy::default(),
            exhaustion: ExhaustionPolicy::default(),
            username: None,
            password: None,
            api_key: None,
        }
    }
}

/// 🚚 Owns the pool and the connection; sends one request at a time with failover.
#[derive(Debug)]
pub struct Transport {
    pool: NodePool,
    connection: ConnectionBackend,
    last_request: Option<RequestAttempt>,
    last_response: Option<Response>,
}

impl Transport {
    /// 🚀 Real HTTP transport for the given hosts.
    pub fn new<S: AsRef<str>>(hosts: &[S], config: &TransportConfig) -> Result<Self> {
        let pool = NodePool::from_hosts(hosts, config.selection, config.exhaustion)?;
        let connection = HttpConnection::new(config)?;
        Ok(Self::with_connection(pool, connection))
    }

    /// 🔌 Bring your own connection. Tests bring an [`InMemoryConnection`].
    pub fn with_connection(pool: NodePool, connection: impl Into<ConnectionBackend>) -> Self {
        Self {
            pool,
            connection: connection.into(),
            last_request: None,
            last_response: None,
        }
    }

    pub fn node_pool(&self) -> &NodePool {
        &self.pool
    }

    pub fn node_pool_mut(&mut self) -> &mut NodePool {
        &mut self.pool
    }

    pub fn last_request(&self) -> Option<&RequestAttempt> {
        self.last_request.as_ref()
    }

    pub fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    /// 📡 Send `request`, failing over across nodes on connection-level errors.
    ///
    /// At most `node_pool().len()` attempts. Dead marks stick around after the call returns;
    /// under [`ExhaustionPolicy::Resurrect`] an all-dead pool is revived once per call.
    pub async fn execute(&mut self, request: RequestAttempt) -> Result<Response> {
        let budget = self.pool.len();
        let mut attempts = 0;
        let mut resurrected = false;
        let mut last_cause: Option<String> = None;

        // -- 🪞 request and response describe one exchange; a failed call leaves no response
        self.last_request = Some(request.clone());
        self.last_response = None;

        while attempts < budget {
            let node_id = match self.pool.next_node() {
                Some(id) => id,
                None if self.pool.exhaustion() == ExhaustionPolicy::Resurrect && !resurrected => {
                    resurrected = true;
                    self.pool.resurrect_all();
                    continue;
                }
                None => break,
            };
            let Some(node) = self.pool.node(node_id) else {
                break;
            };
            let address = node.address().clone();
            attempts += 1;
            debug!(
                "🎯 Attempt {}/{}: {} {} via {}",
                attempts,
                budget,
                request.method(),
                request.path(),
                address
            );

            match self.connection.send(&address, &request).await {
                Ok(response) => {
                    self.pool.mark_alive(node_id);
                    trace!("✅ {} answered with {}", address, response.status());
                    self.last_response = Some(response.clone());
                    return Ok(response);
                }
                Err(SendError::Unreachable(cause)) => {
                    warn!(
                        "💀 Node {} is unreachable ({}); marking it dead and moving on",
                        address, cause
                    );
                    self.pool.mark_dead(node_id);
                    last_cause = Some(cause);
                }
                Err(SendError::Fatal(err)) => return Err(err),
            }
        }

        info!(
            "🪦 No node available after {} attempt(s); {} of {} node(s) alive",
            attempts,
            self.pool.alive_count(),
            self.pool.len()
        );
        Err(ElastxError::NoNodeAvailable {
            attempts,
            last_cause,
        })
    }
}
