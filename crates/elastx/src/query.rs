//! 🔍 Query DSL builders: small structs that know exactly one JSON shape each.
//!
//! 🧠 Knowledge graph:
//! - [`Query`]: the trait every builder implements; `to_value()` is the JSON the server sees.
//! - [`Rewrite`]: the multi-term rewrite modes shared by fuzzy, prefix and regexp.
//! - Builders: [`Fuzzy`], [`Prefix`], [`Regexp`]. Single field each. Second field? Error.
//!
//! Anything not modelled here can go to [`crate::Client::search`] as a raw `serde_json::Value`.
//! We are not in the business of re-typing the entire Elasticsearch DSL. Nobody is. 🦆

use std::fmt;

use serde_json::{Value, json};

pub mod fuzzy;
pub mod prefix;
pub mod regexp;

pub use fuzzy::Fuzzy;
pub use prefix::Prefix;
pub use regexp::Regexp;

/// 🔍 Something that renders to a query DSL clause.
pub trait Query {
    /// 🦆 The clause itself, e.g. `{"prefix": {"name": {...}}}`.
    fn to_value(&self) -> Value;

    /// 📦 The clause wrapped as a full search body: `{"query": <clause>}`.
    fn to_search_body(&self) -> Value {
        json!({ "query": self.to_value() })
    }
}

/// 🔄 Multi-term rewrite modes. The `N` variants carry their size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    ConstantScore,
    ConstantScoreBoolean,
    ScoringBoolean,
    TopTermsBlendedFreqs(u32),
    TopTermsBoost(u32),
    TopTerms(u32),
    /// 🧪 Whatever string your cluster version understands that we don't.
    Custom(String),
}

impl fmt::Display for Rewrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rewrite::ConstantScore => f.write_str("constant_score"),
            Rewrite::ConstantScoreBoolean => f.write_str("constant_score_boolean"),
            Rewrite::ScoringBoolean => f.write_str("scoring_boolean"),
            Rewrite::TopTermsBlendedFreqs(n) => write!(f, "top_terms_blended_freqs_{}", n),
            Rewrite::TopTermsBoost(n) => write!(f, "top_terms_boost_{}", n),
            Rewrite::TopTerms(n) => write!(f, "top_terms_{}", n),
            Rewrite::Custom(raw) => f.write_str(raw),
        }
    }
}

impl From<Rewrite> for Value {
    fn from(rewrite: Rewrite) -> Self {
        Value::String(rewrite.to_string())
    }
}
