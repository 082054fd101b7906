//! 🔤 Prefix query: everything that starts with "ni".

use serde_json::{Map, Value, json};

use super::{Query, Rewrite};
use crate::error::{ElastxError, Result};

/// 🔤 `{"prefix": {"<field>": {"value": "...", "boost": 1.0, "rewrite": "..."}}}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prefix {
    field: Option<(String, Value)>,
}

impl Prefix {
    /// 🏗️ Shorthand for `Prefix::default()` + [`Prefix::set_prefix`].
    pub fn new(field: impl Into<String>, value: impl Into<Value>, boost: f64) -> Self {
        let mut query = Self::default();
        query.set_prefix(field, value, boost);
        query
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_ref().map(|(name, _)| name.as_str())
    }

    /// 🎯 Replace the whole clause with `{field: {"value": value, "boost": boost}}`.
    pub fn set_prefix(&mut self, field: impl Into<String>, value: impl Into<Value>, boost: f64) -> &mut Self {
        self.field = Some((field.into(), json!({ "value": value.into(), "boost": boost })));
        self
    }

    /// 🧪 Hand-rolled clause body for the options we don't model. One key at most.
    pub fn set_raw_prefix(&mut self, raw: Map<String, Value>) -> Result<&mut Self> {
        if raw.len() > 1 {
            return Err(ElastxError::invalid(format!(
                "prefix query can only support a single field, got {}",
                raw.len()
            )));
        }
        self.field = raw.into_iter().next();
        Ok(self)
    }

    pub fn set_rewrite(&mut self, rewrite: Rewrite) -> Result<&mut Self> {
        let (_, body) = self
            .field
            .as_mut()
            .ok_or_else(|| ElastxError::invalid("no field has been set on the prefix query"))?;
        // -- 🔧 `{"user": "ki"}` is legal shorthand; promote it so the rewrite has somewhere to live
        if !body.is_object() {
            let shorthand = body.take();
            *body = json!({ "value": shorthand });
        }
        if let Some(map) = body.as_object_mut() {
            map.insert("rewrite".to_string(), rewrite.into());
        }
        Ok(self)
    }
}

impl Query for Prefix {
    fn to_value(&self) -> Value {
        let mut body = Map::new();
        if let Some((name, params)) = &self.field {
            body.insert(name.clone(), params.clone());
        }
        json!({ "prefix": body })
    }
}
