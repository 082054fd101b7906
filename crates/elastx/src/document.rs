//! 📄 Documents: the `_source`, plus the metadata that tells Elasticsearch where it lives.
//!
//! A [`Document`] is JSON data wearing a name tag: id, index, routing, pipeline, version.
//! Every tag is optional because Elasticsearch will happily make up an id for you, and the
//! index may come from the bulk request instead. Whether that's a feature or a cry for help
//! depends on your use case. 🦆
//!
//! [`UpdatePayload`] is the three ways to say "change this document": a partial document,
//! a script, or raw JSON you wrote yourself.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::{ElastxError, Result};
use crate::script::Script;

/// 🔧 Document-related client settings.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DocumentConfig {
    /// 🪄 Write server-assigned ids and versions back into documents after an add.
    #[serde(default)]
    pub auto_populate: bool,
}

/// 📄 One document and its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: Option<String>,
    index: Option<String>,
    routing: Option<String>,
    pipeline: Option<String>,
    version: Option<u64>,
    data: Value,
    upsert: Option<Box<Document>>,
    doc_as_upsert: bool,
    auto_populate: bool,
    retry_on_conflict: Option<u32>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(json!({}))
    }
}

impl Document {
    /// 🏗️ A document with this `_source` and no metadata. The source should be a JSON object;
    /// anything else is refused when the document is sent.
    pub fn new(data: Value) -> Self {
        Self {
            id: None,
            index: None,
            routing: None,
            pipeline: None,
            version: None,
            data,
            upsert: None,
            doc_as_upsert: false,
            auto_populate: false,
            retry_on_conflict: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    /// 🧪 Ingest pipeline to run on index.
    pub fn with_pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    /// 🆕 Document to insert when an update targets an id that does not exist yet.
    pub fn with_upsert(mut self, upsert: Document) -> Self {
        self.upsert = Some(Box::new(upsert));
        self
    }

    /// 🆕 Use this document's own data as the upsert.
    pub fn with_doc_as_upsert(mut self, doc_as_upsert: bool) -> Self {
        self.doc_as_upsert = doc_as_upsert;
        self
    }

    pub fn with_auto_populate(mut self, auto_populate: bool) -> Self {
        self.auto_populate = auto_populate;
        self
    }

    pub fn with_retry_on_conflict(mut self, retries: u32) -> Self {
        self.retry_on_conflict = Some(retries);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    pub fn set_index(&mut self, index: impl Into<String>) {
        self.index = Some(index.into());
    }

    pub fn routing(&self) -> Option<&str> {
        self.routing.as_deref()
    }

    pub fn pipeline(&self) -> Option<&str> {
        self.pipeline.as_deref()
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn has_version(&self) -> bool {
        self.version.is_some()
    }

    pub fn set_version(&mut self, version: u64) {
        self.version = Some(version);
    }

    pub fn upsert(&self) -> Option<&Document> {
        self.upsert.as_deref()
    }

    pub fn doc_as_upsert(&self) -> bool {
        self.doc_as_upsert
    }

    pub fn auto_populate(&self) -> bool {
        self.auto_populate
    }

    pub fn retry_on_conflict(&self) -> Option<u32> {
        self.retry_on_conflict
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// ✏️ Set one field of the source. A non-object source is replaced by an object first.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        if !self.data.is_object() {
            self.data = Value::Object(Map::new());
        }
        if let Some(map) = self.data.as_object_mut() {
            map.insert(key.into(), value.into());
        }
        self
    }

    /// 📦 The source, checked to be a JSON object.
    pub(crate) fn source(&self) -> Result<&Value> {
        if self.data.is_object() {
            Ok(&self.data)
        } else {
            Err(ElastxError::invalid(format!(
                "document {} has a non-object source; Elasticsearch only indexes JSON objects",
                self.id.as_deref().unwrap_or("<no id>")
            )))
        }
    }

    /// 🏗️ Build a document from a `GET /{index}/_doc/{id}` response body.
    pub(crate) fn from_get_response(body: &Value) -> Result<Self> {
        let mut doc = Document::new(body.get("_source").cloned().unwrap_or_else(|| json!({})));
        doc.id = body.get("_id").and_then(Value::as_str).map(str::to_string);
        doc.index = body.get("_index").and_then(Value::as_str).map(str::to_string);
        doc.routing = body.get("_routing").and_then(Value::as_str).map(str::to_string);
        doc.version = body.get("_version").and_then(Value::as_u64);
        Ok(doc)
    }
}

/// ✏️ The three ways to describe an update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdatePayload {
    /// 📄 Partial document merged into the existing one.
    Document(Document),
    /// 📜 A script run against the existing document.
    Script(Script),
    /// 🧪 Your own update body, e.g. `{"doc": {...}}`.
    Raw(Value),
}

impl UpdatePayload {
    /// 🦆 The `_update` request body.
    pub fn to_body(&self) -> Result<Value> {
        match self {
            UpdatePayload::Document(doc) => {
                let mut body = Map::new();
                body.insert("doc".to_string(), doc.source()?.clone());
                if doc.doc_as_upsert() {
                    body.insert("doc_as_upsert".to_string(), Value::Bool(true));
                }
                if let Some(upsert) = doc.upsert() {
                    body.insert("upsert".to_string(), upsert.source()?.clone());
                }
                Ok(Value::Object(body))
            }
            UpdatePayload::Script(script) => script.to_value(),
            UpdatePayload::Raw(raw) if raw.is_object() => Ok(raw.clone()),
            UpdatePayload::Raw(_) => Err(ElastxError::invalid(
                "a raw update body must be a JSON object",
            )),
        }
    }
}

impl From<Document> for UpdatePayload {
    fn from(doc: Document) -> Self {
        UpdatePayload::Document(doc)
    }
}

impl From<Script> for UpdatePayload {
    fn from(script: Script) -> Self {
        UpdatePayload::Script(script)
    }
}

impl From<Value> for UpdatePayload {
    fn from(raw: Value) -> Self {
        UpdatePayload::Raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_a_document_wears_all_its_name_tags() {
        let doc = Document::new(json!({"username": "hans"}))
            .with_id("1")
            .with_index("users")
            .with_routing("r1")
            .with_pipeline("renaming");
        assert_eq!(doc.id(), Some("1"));
        assert_eq!(doc.index(), Some("users"));
        assert_eq!(doc.routing(), Some("r1"));
        assert_eq!(doc.pipeline(), Some("renaming"));
        assert_eq!(doc.get("username"), Some(&json!("hans")));
        assert!(!doc.has_version());
    }

    #[test]
    fn the_one_where_set_turns_a_scalar_source_into_an_object() {
        let mut doc = Document::new(json!("not an object"));
        assert!(doc.source().is_err());
        doc.set("name", "anoncoin");
        assert_eq!(doc.data(), &json!({"name": "anoncoin"}));
    }

    #[test]
    fn the_one_where_a_document_update_carries_its_upsert() -> Result<()> {
        let update = UpdatePayload::from(
            Document::new(json!({"field1": "value1updated"}))
                .with_upsert(Document::new(json!({"field1": "value1"}))),
        );
        assert_eq!(
            update.to_body()?,
            json!({"doc": {"field1": "value1updated"}, "upsert": {"field1": "value1"}})
        );
        Ok(())
    }

    #[test]
    fn the_one_where_doc_as_upsert_is_announced() -> Result<()> {
        let update = UpdatePayload::from(Document::new(json!({"a": 1})).with_doc_as_upsert(true));
        assert_eq!(update.to_body()?, json!({"doc": {"a": 1}, "doc_as_upsert": true}));
        Ok(())
    }

    #[test]
    fn the_one_where_a_raw_update_must_be_an_object() {
        assert!(UpdatePayload::from(json!([1, 2, 3])).to_body().is_err());
        assert!(UpdatePayload::from(json!({"doc": {"a": 1}})).to_body().is_ok());
    }

    #[test]
    fn the_one_where_a_get_response_becomes_a_document() -> Result<()> {
        let doc = Document::from_get_response(&json!({
            "_index": "cryptocurrencies",
            "_id": "1",
            "_version": 3,
            "found": true,
            "_source": {"name": "anoncoin"}
        }))?;
        assert_eq!(doc.id(), Some("1"));
        assert_eq!(doc.index(), Some("cryptocurrencies"));
        assert_eq!(doc.version(), Some(3));
        assert_eq!(doc.get("name"), Some(&json!("anoncoin")));
        Ok(())
    }
}
