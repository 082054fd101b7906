//! 💀 Errors: the part of the client that talks back.
//!
//! 📡 Every failure a caller can actually *do* something about gets its own variant.
//! Connection hiccups on a single node never make it this far: the transport eats them,
//! marks the node dead, and moves on. Only when every node has ghosted us do you meet
//! [`ElastxError::NoNodeAvailable`]. 🦆

use thiserror::Error;

/// 🏷️ The library-wide result alias. Short, sweet, and fully typed.
pub type Result<T, E = ElastxError> = std::result::Result<T, E>;

/// 💀 Everything that can go wrong between "build a query" and "read the response".
#[derive(Debug, Error)]
pub enum ElastxError {
    /// 📡 Every configured node was tried and none answered.
    /// The terminal connectivity failure. There is no next node. There is only this.
    #[error(
        "💀 No node available: tried {attempts} attempt(s) across the pool and every node ghosted us. Last cause: {}",
        last_cause.as_deref().unwrap_or("no alive node left to try")
    )]
    NoNodeAvailable {
        attempts: usize,
        last_cause: Option<String>,
    },

    /// 🔧 The caller asked for something the builder cannot represent.
    /// Second field on a single-field query, rewrite with no field, document without an index.
    #[error("💀 Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// 🔍 Elasticsearch looked. It did not find.
    #[error("💀 Not found: {0}")]
    NotFound(String),

    /// 📬 The node answered, but the answer was a non-2xx status.
    #[error("💀 Elasticsearch answered with status {status}: {body}")]
    Response { status: u16, body: String },

    /// 🦆 JSON refused to become a struct, or a struct refused to become JSON.
    #[error("💀 JSON (de)serialization failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// 🌐 HTTP-layer failure that is not about reachability (bad URL, client build, body read).
    #[error("💀 HTTP failure: {0}")]
    Http(String),
}

impl ElastxError {
    /// 🔧 Shorthand, because `ElastxError::InvalidConfiguration(format!(...))` is a lot of typing.
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ElastxError::InvalidConfiguration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_no_node_available_explains_itself() {
        let err = ElastxError::NoNodeAvailable {
            attempts: 2,
            last_cause: Some("connection refused".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("2 attempt(s)"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn the_one_where_exhaustion_without_a_cause_still_has_words() {
        let err = ElastxError::NoNodeAvailable {
            attempts: 0,
            last_cause: None,
        };
        assert!(err.to_string().contains("no alive node left to try"));
    }
}
