//! 🗺️ The Node Pool: the roll call of every Elasticsearch host we were told about.
//!
//! 🎬 *[a bouncer with a clipboard stands at the door of the cluster]*
//! "Alive? You're in. Dead? Wait over there. No, I will not tell you when you can come back."
//!
//! The pool owns every [`Node`] outright. Nobody else gets a `&mut Node`; callers hold a
//! [`NodeId`] (an index into the pool) and ask the pool to flip liveness for them.
//! Selection is deterministic: same liveness state in, same node out. Tests sleep better. 🦆

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{ElastxError, Result};

/// 🔌 The port Elasticsearch listens on when nobody says otherwise.
pub const DEFAULT_PORT: u16 = 9200;

/// 📍 Where a node lives: scheme, host, port. Parsed from `host`, `host:port`, or `scheme://host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddress {
    scheme: String,
    host: String,
    port: u16,
}

impl NodeAddress {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// 🔑 `host:port`, the bit humans type in config files.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 🧭 The root URL of this node, path `/`, ready for segments to be appended.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&format!("{}/", self))
            .map_err(|e| ElastxError::invalid(format!("node '{}' is not a valid base URL: {}", self, e)))
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl FromStr for NodeAddress {
    type Err = ElastxError;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ElastxError::invalid("an empty host string is not a node"));
        }

        // -- 🔧 bare `host:port` gets an http:// hat so the URL parser stops squinting at it
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let parsed = Url::parse(&with_scheme).map_err(|e| {
            ElastxError::invalid(format!("host '{}' does not parse as a node address: {}", raw, e))
        })?;

        let scheme = parsed.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(ElastxError::invalid(format!(
                "host '{}' uses scheme '{}'; only http and https speak Elasticsearch",
                raw, scheme
            )));
        }

        // -- 🚫 every request path is built from the root, and credentials belong in the
        // -- transport config; a host string carrying either would be quietly misrouted
        if !matches!(parsed.path(), "" | "/") || parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ElastxError::invalid(format!(
                "host '{}' carries a path, query or fragment; only scheme://host:port is supported",
                raw
            )));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(ElastxError::invalid(format!(
                "host '{}' carries credentials; set transport.username/password or transport.api_key instead",
                raw
            )));
        }

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ElastxError::invalid(format!("host '{}' has no host part", raw)))?
            .to_string();

        // ⚠️ Url::port() hides ports that equal the scheme default (80/443), so an explicit
        // `:80` would silently turn into 9200. Read the authority ourselves.
        let port = explicit_port(&with_scheme)?.unwrap_or(DEFAULT_PORT);

        Ok(Self { scheme, host, port })
    }
}

/// 🔍 Pull `:port` off the authority if one was actually written down.
fn explicit_port(with_scheme: &str) -> Result<Option<u16>> {
    let after_scheme = with_scheme
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(with_scheme);
    let authority = after_scheme.split('/').next().unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or(authority);

    // -- 🧱 `[::1]` without a port ends in a bracket; nothing to see here
    if authority.ends_with(']') {
        return Ok(None);
    }
    match authority.rsplit_once(':') {
        Some((_, port)) if !port.is_empty() => port
            .parse::<u16>()
            .map(Some)
            .map_err(|_| ElastxError::invalid(format!("port '{}' is not a valid port", port))),
        _ => Ok(None),
    }
}

/// 💓 Is anybody home?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Dead,
}

/// 🖥️ One configured Elasticsearch host and what we currently believe about it.
#[derive(Debug, Clone)]
pub struct Node {
    address: NodeAddress,
    liveness: Liveness,
    last_failure: Option<SystemTime>,
    failure_count: u32,
}

impl Node {
    fn new(address: NodeAddress) -> Self {
        Self {
            address,
            liveness: Liveness::Alive,
            last_failure: None,
            failure_count: 0,
        }
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn is_alive(&self) -> bool {
        self.liveness == Liveness::Alive
    }

    /// ⏱️ When this node last failed us. `None` if it never has. Survives resurrection.
    pub fn last_failure(&self) -> Option<SystemTime> {
        self.last_failure
    }

    /// 🔢 How many times this node has been marked dead over the life of the pool.
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }
}

/// 🎟️ A handle to a node inside the pool. Just an index, wearing a nametag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 🎯 How the next node gets picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// 🔄 Rotate through alive nodes; the cursor moves past whoever was picked.
    #[default]
    RoundRobin,
    /// 🥇 Always the first alive node in configured order.
    FirstAlive,
}

/// 🪦 What to do when every node is dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// 💀 Fail right away. Dead stays dead until a request proves otherwise.
    #[default]
    Fail,
    /// 🧟 Mark everyone alive again, once per request, and keep trying.
    Resurrect,
}

/// 🗺️ The ordered set of nodes plus liveness tracking and a selection cursor.
#[derive(Debug, Clone)]
pub struct NodePool {
    nodes: Vec<Node>,
    cursor: usize,
    selection: SelectionPolicy,
    exhaustion: ExhaustionPolicy,
}

impl NodePool {
    /// 🏗️ Build a pool from already-parsed addresses. Zero nodes is not a pool, it's a wish.
    pub fn new(
        addresses: Vec<NodeAddress>,
        selection: SelectionPolicy,
        exhaustion: ExhaustionPolicy,
    ) -> Result<Self> {
        if addresses.is_empty() {
            return Err(ElastxError::invalid(
                "the node pool needs at least one host to be usable",
            ));
        }
        debug!(
            "🗺️ Node pool assembled: {} node(s), selection {:?}, exhaustion {:?}",
            addresses.len(),
            selection,
            exhaustion
        );
        Ok(Self {
            nodes: addresses.into_iter().map(Node::new).collect(),
            cursor: 0,
            selection,
            exhaustion,
        })
    }

    /// 🏗️ Build a pool straight from `host:port` strings.
    pub fn from_hosts<S: AsRef<str>>(
        hosts: &[S],
        selection: SelectionPolicy,
        exhaustion: ExhaustionPolicy,
    ) -> Result<Self> {
        let addresses = hosts
            .iter()
            .map(|h| h.as_ref().parse::<NodeAddress>())
            .collect::<Result<Vec<_>>>()?;
        Self::new(addresses, selection, exhaustion)
    }

    /// 🎯 Pick the next node to try. `None` means every node is marked dead.
    pub fn next_node(&mut self) -> Option<NodeId> {
        let len = self.nodes.len();
        match self.selection {
            SelectionPolicy::FirstAlive => self.nodes.iter().position(Node::is_alive).map(NodeId),
            SelectionPolicy::RoundRobin => {
                let picked = (0..len)
                    .map(|offset| (self.cursor + offset) % len)
                    .find(|&idx| self.nodes[idx].is_alive())?;
                self.cursor = (picked + 1) % len;
                Some(NodeId(picked))
            }
        }
    }

    /// 💀 Mark a node dead. Idempotent on liveness; the failure clock and counter still tick.
    pub fn mark_dead(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.liveness = Liveness::Dead;
            node.last_failure = Some(SystemTime::now());
            node.failure_count = node.failure_count.saturating_add(1);
        }
    }

    /// ✅ Mark a node alive. No-op if it already is.
    pub fn mark_alive(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.liveness = Liveness::Alive;
        }
    }

    /// 🧟 Everyone gets back up. Failure history is kept.
    pub fn resurrect_all(&mut self) {
        info!(
            "🧟 Resurrecting all {} node(s); every one of them was dead, giving them another shot",
            self.nodes.len()
        );
        for node in &mut self.nodes {
            node.liveness = Liveness::Alive;
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// 📋 Every node, in configured order. For introspection and assertions.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn alive_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_alive()).count()
    }

    pub fn selection(&self) -> SelectionPolicy {
        self.selection
    }

    pub fn exhaustion(&self) -> ExhaustionPolicy {
        self.exhaustion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(hosts: &[&str], selection: SelectionPolicy) -> NodePool {
        NodePool::from_hosts(hosts, selection, ExhaustionPolicy::Fail)
            .expect("💀 test hosts should parse. they're literally localhost.")
    }

    #[test]
    fn the_one_where_a_path_or_a_password_in_the_host_is_refused() {
        for raw in [
            "http://proxy:8080/es",
            "proxy:8080/es/",
            "http://es:9200/?pretty",
            "http://elastic:changeme@es:9200",
            "https://elastic@es:9243",
        ] {
            assert!(
                matches!(
                    raw.parse::<NodeAddress>(),
                    Err(ElastxError::InvalidConfiguration(_))
                ),
                "{} should be refused",
                raw
            );
        }

        let addr: NodeAddress = "http://es:9200/".parse().expect("💀 a bare trailing slash is fine");
        assert_eq!(addr.to_string(), "http://es:9200");
    }

    #[test]
    fn the_one_where_bare_hosts_get_sensible_defaults() {
        let addr: NodeAddress = "foo.bar".parse().expect("💀 bare host should parse");
        assert_eq!(addr.scheme(), "http");
        assert_eq!(addr.host(), "foo.bar");
        assert_eq!(addr.port(), DEFAULT_PORT);

        let addr: NodeAddress = "localhost:9201".parse().expect("💀 host:port should parse");
        assert_eq!(addr.port(), 9201);
        assert_eq!(addr.authority(), "localhost:9201");
        assert_eq!(addr.to_string(), "http://localhost:9201");
    }

    #[test]
    fn the_one_where_an_explicit_default_port_is_not_swallowed() {
        let addr: NodeAddress = "https://es.example.com:443".parse().expect("💀 https should parse");
        assert_eq!(addr.scheme(), "https");
        assert_eq!(addr.port(), 443);

        let addr: NodeAddress = "localhost:80".parse().expect("💀 port 80 should parse");
        assert_eq!(addr.port(), 80);
    }

    #[test]
    fn the_one_where_garbage_hosts_are_turned_away_at_the_door() {
        assert!(matches!(
            "".parse::<NodeAddress>(),
            Err(ElastxError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            "ftp://files.example.com".parse::<NodeAddress>(),
            Err(ElastxError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            "localhost:notaport".parse::<NodeAddress>(),
            Err(ElastxError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn the_one_where_an_empty_pool_is_not_a_pool() {
        let empty: [&str; 0] = [];
        let result = NodePool::from_hosts(&empty, SelectionPolicy::RoundRobin, ExhaustionPolicy::Fail);
        assert!(matches!(result, Err(ElastxError::InvalidConfiguration(_))));
    }

    #[test]
    fn the_one_where_round_robin_goes_round_and_round() {
        let mut pool = pool(&["a:9200", "b:9200", "c:9200"], SelectionPolicy::RoundRobin);
        let picks: Vec<usize> = (0..4)
            .map(|_| pool.next_node().expect("💀 everyone is alive").index())
            .collect();
        assert_eq!(picks, vec![0, 1, 2, 0]);
    }

    #[test]
    fn the_one_where_round_robin_steps_over_the_dead() {
        let mut pool = pool(&["a:9200", "b:9200", "c:9200"], SelectionPolicy::RoundRobin);
        pool.mark_dead(NodeId(1));
        let picks: Vec<usize> = (0..4)
            .map(|_| pool.next_node().expect("💀 two nodes still alive").index())
            .collect();
        assert_eq!(picks, vec![0, 2, 0, 2]);
    }

    #[test]
    fn the_one_where_first_alive_is_a_creature_of_habit() {
        let mut pool = pool(&["a:9200", "b:9200", "c:9200"], SelectionPolicy::FirstAlive);
        assert_eq!(pool.next_node(), Some(NodeId(0)));
        assert_eq!(pool.next_node(), Some(NodeId(0)));
        pool.mark_dead(NodeId(0));
        assert_eq!(pool.next_node(), Some(NodeId(1)));
    }

    #[test]
    fn the_one_where_an_all_dead_pool_offers_nobody() {
        let mut pool = pool(&["a:9200", "b:9200"], SelectionPolicy::RoundRobin);
        pool.mark_dead(NodeId(0));
        pool.mark_dead(NodeId(1));
        assert_eq!(pool.next_node(), None);
        assert_eq!(pool.alive_count(), 0);
    }

    #[test]
    fn the_one_where_marking_is_idempotent_but_history_is_kept() {
        let mut pool = pool(&["a:9200"], SelectionPolicy::RoundRobin);
        pool.mark_dead(NodeId(0));
        pool.mark_dead(NodeId(0));
        let node = pool.node(NodeId(0)).expect("💀 node 0 exists");
        assert_eq!(node.liveness(), Liveness::Dead);
        assert_eq!(node.failure_count(), 2);
        assert!(node.last_failure().is_some());

        pool.mark_alive(NodeId(0));
        pool.mark_alive(NodeId(0));
        let node = pool.node(NodeId(0)).expect("💀 node 0 exists");
        assert!(node.is_alive());
        assert!(node.last_failure().is_some());
    }

    #[test]
    fn the_one_where_resurrection_brings_everyone_back() {
        let mut pool = pool(&["a:9200", "b:9200"], SelectionPolicy::FirstAlive);
        pool.mark_dead(NodeId(0));
        pool.mark_dead(NodeId(1));
        pool.resurrect_all();
        assert_eq!(pool.alive_count(), 2);
        assert_eq!(pool.next_node(), Some(NodeId(0)));
    }
}
