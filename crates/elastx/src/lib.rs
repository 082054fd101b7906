//! 🛰️ elastx: an Elasticsearch REST client that keeps going when nodes don't.
//!
//! 🎬 *[narrator voice]* "Three nodes were configured. One was on fire. The client didn't care."
//!
//! 📦 What's in the box:
//! - [`Client`] and [`Index`]: documents, bulk, search, stats, the usual suspects
//! - [`transport`]: the node pool, dead/alive bookkeeping, failover across nodes
//! - [`query`]: typed builders for fuzzy, prefix and regexp queries
//! - [`Document`], [`Script`], [`Bulk`]: the things you send
//! - [`load_config`]: figment-powered config from `ELASTX_*` env vars and a TOML file
//!
//! ```no_run
//! # async fn demo() -> elastx::Result<()> {
//! use elastx::{Client, ClientConfig};
//!
//! let mut client = Client::new(&ClientConfig::with_hosts(["localhost:9200", "localhost:9201"]))?;
//! println!("🏷️ {}", client.version().await?);
//! # Ok(())
//! # }
//! ```

pub mod app_config;
pub mod bulk;
pub mod client;
pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod script;
pub mod transport;

pub use app_config::{ClientConfig, load_config};
pub use bulk::{Action, Bulk, BulkItem, OpType, ResponseSet};
pub use client::Client;
pub use document::{Document, DocumentConfig, UpdatePayload};
pub use error::{ElastxError, Result};
pub use index::Index;
pub use query::{Fuzzy, Prefix, Query, Regexp, Rewrite};
pub use script::Script;
pub use transport::{
    ExhaustionPolicy, InMemoryConnection, Node, NodeAddress, NodePool, RequestAttempt, Response,
    SelectionPolicy, Transport, TransportConfig,
};
