//! 📬 Responses: status code plus the raw body, decoded on demand.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ElastxError, Result};

/// 📬 What a node said back. Any status counts as "the node is alive"; judging the
/// status is the caller's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// ✅ 2xx, nothing else.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// 🦆 The body as loose JSON. An empty body (HEAD, some 404s) is `Null`.
    pub fn as_value(&self) -> Result<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        self.json()
    }

    /// 🚦 Pass 2xx through, turn everything else into [`ElastxError::Response`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(ElastxError::Response {
                status: self.status,
                body: self.body,
            })
        }
    }
}
