//! 📜 Scripts: painless, allegedly.

use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::Result;

/// 📜 The language everyone uses and nobody can spell without checking.
pub const LANG_PAINLESS: &str = "painless";

/// 📜 An inline script for `_update`, with params and an optional upsert document.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    source: String,
    lang: Option<String>,
    params: Map<String, Value>,
    upsert: Option<Document>,
}

impl Script {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            lang: None,
            params: Map::new(),
            upsert: None,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// 🆕 Inserted as-is when the target document does not exist; the script is skipped.
    pub fn set_upsert(&mut self, upsert: Document) -> &mut Self {
        self.upsert = Some(upsert);
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn upsert(&self) -> Option<&Document> {
        self.upsert.as_ref()
    }

    /// 🦆 `{"script": {...}, "upsert": {...}}`, ready for `_update` or a bulk update line.
    pub fn to_value(&self) -> Result<Value> {
        let mut script = Map::new();
        script.insert("source".to_string(), Value::String(self.source.clone()));
        if let Some(lang) = &self.lang {
            script.insert("lang".to_string(), Value::String(lang.clone()));
        }
        if !self.params.is_empty() {
            script.insert("params".to_string(), Value::Object(self.params.clone()));
        }

        let mut body = Map::new();
        body.insert("script".to_string(), Value::Object(script));
        if let Some(upsert) = &self.upsert {
            body.insert("upsert".to_string(), upsert.source()?.clone());
        }
        Ok(Value::Object(body))
    }
}
