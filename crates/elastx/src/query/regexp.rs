//! 🧩 Regexp query: for when a prefix is not enough and you have made peace with the consequences.

use serde_json::{Map, Value, json};

use super::{Query, Rewrite};
use crate::error::{ElastxError, Result};

/// 🧩 `{"regexp": {"<field>": {"value": "...", "boost": 1.0, "rewrite": "..."}}}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Regexp {
    field: Option<(String, Map<String, Value>)>,
}

impl Regexp {
    pub fn new(field: impl Into<String>, value: impl Into<String>, boost: f64) -> Self {
        let mut query = Self::default();
        query.set_value(field, value, boost);
        query
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_ref().map(|(name, _)| name.as_str())
    }

    /// 🎯 Set the expression for a field. Replaces any previous field and its options.
    pub fn set_value(&mut self, field: impl Into<String>, value: impl Into<String>, boost: f64) -> &mut Self {
        let mut params = Map::new();
        params.insert("value".to_string(), Value::String(value.into()));
        params.insert("boost".to_string(), json!(boost));
        self.field = Some((field.into(), params));
        self
    }

    /// 🚩 Regex operator flags, e.g. `"INTERSECTION|COMPLEMENT"`.
    pub fn set_flags(&mut self, flags: impl Into<String>) -> Result<&mut Self> {
        self.set_option("flags", Value::String(flags.into()))
    }

    pub fn set_rewrite(&mut self, rewrite: Rewrite) -> Result<&mut Self> {
        self.set_option("rewrite", rewrite.into())
    }

    fn set_option(&mut self, option: &str, value: Value) -> Result<&mut Self> {
        let (_, params) = self
            .field
            .as_mut()
            .ok_or_else(|| ElastxError::invalid("no field has been set on the regexp query"))?;
        params.insert(option.to_string(), value);
        Ok(self)
    }
}

impl Query for Regexp {
    fn to_value(&self) -> Value {
        let mut body = Map::new();
        if let Some((name, params)) = &self.field {
            body.insert(name.clone(), Value::Object(params.clone()));
        }
        json!({ "regexp": body })
    }
}
