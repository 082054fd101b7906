//! 📡 Bulk: formatting actions for the `_bulk` API's peculiar tastes 🚀
//!
//! 🎬 COLD OPEN. INT. ELASTICSEARCH CLUSTER, BULK ENDPOINT, HIGH NOON
//!
//! The bulk API has rules.
//! Rule 1: one action line per operation, then the source line if the operation has one.
//!         `delete` doesn't. Everyone else does.
//! Rule 2: newline-delimited. Not comma-separated. Not a JSON array. NEWLINES.
//! Rule 3: the body ends with a newline. It MATTERS. Three engineers lost weekends to this.
//!
//! ## Knowledge Graph 🧠
//! - [`Action`]: one operation, metadata + optional source, rendered to its NDJSON lines
//! - [`Bulk`]: ordered actions + optional default index + request params → one [`RequestAttempt`]
//! - [`ResponseSet`]: the parsed `_bulk` answer, per-item status and the first error, if any
//! - Index names stay raw in the JSON lines; only the URI path gets percent-encoded. 🦆

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::document::{Document, UpdatePayload};
use crate::error::{ElastxError, Result};
use crate::transport::{RequestAttempt, Response};

/// 🎬 The four things a bulk line can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    Index,
    Create,
    Update,
    Delete,
}

impl OpType {
    pub fn as_str(self) -> &'static str {
        match self {
            OpType::Index => "index",
            OpType::Create => "create",
            OpType::Update => "update",
            OpType::Delete => "delete",
        }
    }
}

/// 📦 One bulk operation: the action metadata and, unless it's a delete, a source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    op: OpType,
    metadata: Map<String, Value>,
    source: Option<Value>,
}

impl Action {
    /// 📄 `index` a document (create or overwrite).
    pub fn index(doc: &Document) -> Result<Self> {
        Self::for_document(OpType::Index, doc)
    }

    /// 🆕 `create` a document; fails server-side if the id is taken.
    pub fn create(doc: &Document) -> Result<Self> {
        Self::for_document(OpType::Create, doc)
    }

    /// ✏️ `update` with the document as a partial doc. Needs an id.
    pub fn update(doc: &Document) -> Result<Self> {
        let id = doc.id().ok_or_else(|| {
            ElastxError::invalid("a bulk update needs a document id; there is nothing to update otherwise")
        })?;
        let mut action = Self::update_with(id, doc.index(), UpdatePayload::Document(doc.clone()))?;
        if let Some(routing) = doc.routing() {
            action.set_meta("routing", routing);
        }
        if let Some(retries) = doc.retry_on_conflict() {
            action.metadata.insert("retry_on_conflict".to_string(), Value::from(retries));
        }
        Ok(action)
    }

    /// ✏️ `update` with any payload (document, script, raw).
    pub fn update_with(id: &str, index: Option<&str>, payload: UpdatePayload) -> Result<Self> {
        let mut action = Self {
            op: OpType::Update,
            metadata: Map::new(),
            source: Some(payload.to_body()?),
        };
        action.set_meta("_id", id);
        if let Some(index) = index {
            action.set_meta("_index", index);
        }
        Ok(action)
    }

    /// 🗑️ `delete` by id. No source line, just the action.
    pub fn delete(id: &str, index: Option<&str>, routing: Option<&str>) -> Self {
        let mut action = Self {
            op: OpType::Delete,
            metadata: Map::new(),
            source: None,
        };
        action.set_meta("_id", id);
        if let Some(index) = index {
            action.set_meta("_index", index);
        }
        if let Some(routing) = routing {
            action.set_meta("routing", routing);
        }
        action
    }

    /// 🗑️ `delete` the document this struct describes. Needs an id.
    pub fn delete_document(doc: &Document) -> Result<Self> {
        let id = doc
            .id()
            .ok_or_else(|| ElastxError::invalid("a bulk delete needs a document id"))?;
        Ok(Self::delete(id, doc.index(), doc.routing()))
    }

    fn for_document(op: OpType, doc: &Document) -> Result<Self> {
        let mut action = Self {
            op,
            metadata: Map::new(),
            source: Some(doc.source()?.clone()),
        };
        // -- 📎 absent fields are omitted, not nulled; ES fills in what it can
        if let Some(id) = doc.id() {
            action.set_meta("_id", id);
        }
        if let Some(index) = doc.index() {
            action.set_meta("_index", index);
        }
        if let Some(routing) = doc.routing() {
            action.set_meta("routing", routing);
        }
        if let Some(pipeline) = doc.pipeline() {
            action.set_meta("pipeline", pipeline);
        }
        Ok(action)
    }

    fn set_meta(&mut self, key: &str, value: &str) {
        self.metadata
            .insert(key.to_string(), Value::String(value.to_string()));
    }

    pub fn op(&self) -> OpType {
        self.op
    }

    pub fn index_name(&self) -> Option<&str> {
        self.metadata.get("_index").and_then(Value::as_str)
    }

    /// 🔄 The action's NDJSON lines, each terminated by `\n`.
    pub fn to_ndjson(&self) -> Result<String> {
        let mut envelope = Map::new();
        envelope.insert(
            self.op.as_str().to_string(),
            Value::Object(self.metadata.clone()),
        );
        let mut out = serde_json::to_string(&Value::Object(envelope))?;
        out.push('\n');
        if let Some(source) = &self.source {
            out.push_str(&serde_json::to_string(source)?);
            out.push('\n');
        }
        Ok(out)
    }
}

/// 🚚 A batch of actions headed for one `_bulk` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bulk {
    index: Option<String>,
    actions: Vec<Action>,
    params: Vec<(String, String)>,
}

impl Bulk {
    pub fn new() -> Self {
        Self::default()
    }

    /// 📍 Default index for actions that don't name one. Goes in the URI: `/{index}/_bulk`.
    pub fn set_index(&mut self, index: impl Into<String>) -> &mut Self {
        self.index = Some(index.into());
        self
    }

    pub fn add_action(&mut self, action: Action) -> &mut Self {
        self.actions.push(action);
        self
    }

    pub fn add_documents(&mut self, docs: &[Document], op: OpType) -> Result<&mut Self> {
        for doc in docs {
            let action = match op {
                OpType::Index => Action::index(doc)?,
                OpType::Create => Action::create(doc)?,
                OpType::Update => Action::update(doc)?,
                OpType::Delete => Action::delete_document(doc)?,
            };
            self.actions.push(action);
        }
        Ok(self)
    }

    /// 🔧 Request-level params: `refresh`, `pipeline`, `routing`, `timeout`, ...
    pub fn set_request_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// 📜 The full NDJSON body, trailing newline included.
    pub fn to_ndjson(&self) -> Result<String> {
        let mut body = String::new();
        for action in &self.actions {
            body.push_str(&action.to_ndjson()?);
        }
        Ok(body)
    }

    /// 📨 Validate and turn into a request. Every action needs an index from somewhere.
    pub fn to_request(&self) -> Result<RequestAttempt> {
        if self.actions.is_empty() {
            return Err(ElastxError::invalid("a bulk request with no actions has nothing to say"));
        }
        if self.index.is_none() && self.actions.iter().any(|a| a.index_name().is_none()) {
            return Err(ElastxError::invalid(
                "every bulk action needs an index: set one on the document or on the bulk",
            ));
        }
        let mut segments = Vec::new();
        if let Some(index) = &self.index {
            segments.push(index.clone());
        }
        segments.push("_bulk".to_string());
        Ok(RequestAttempt::post(segments)
            .with_params(self.params.iter().cloned())
            .with_ndjson(self.to_ndjson()?))
    }
}

#[derive(Debug, Deserialize)]
struct RawBulkResponse {
    #[serde(default)]
    took: Option<u64>,
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<Value>,
}

/// 📋 How one bulk item went.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItem {
    pub op: String,
    pub index: Option<String>,
    pub id: Option<String>,
    pub version: Option<u64>,
    pub status: u16,
    pub error: Option<Value>,
}

impl BulkItem {
    /// 🧱 Stand-in for an item the server sent without an operation key.
    fn malformed(raw: &Value) -> Self {
        Self {
            op: String::new(),
            index: None,
            id: None,
            version: None,
            status: 0,
            error: Some(serde_json::json!({
                "type": "malformed_bulk_item",
                "reason": format!("bulk response item carried no operation: {}", raw),
            })),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }

    /// 💬 The error reason, or the error type, or the whole error JSON. In that order of hope.
    pub fn error_reason(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        Some(
            error
                .get("reason")
                .or_else(|| error.get("type"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
        )
    }
}

/// 📋 The parsed answer to a `_bulk` request, one item per action, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSet {
    took: Option<u64>,
    errors: bool,
    items: Vec<BulkItem>,
}

impl ResponseSet {
    pub fn from_response(response: &Response) -> Result<Self> {
        let raw: RawBulkResponse = response.json()?;
        let items = raw
            .items
            .into_iter()
            .map(|entry| {
                let Some((op, detail)) = entry
                    .as_object()
                    .and_then(|entry| entry.iter().next())
                else {
                    // -- 🧱 keep the slot so item N still lines up with action N
                    return BulkItem::malformed(&entry);
                };
                BulkItem {
                    op: op.clone(),
                    index: detail.get("_index").and_then(Value::as_str).map(str::to_string),
                    id: detail.get("_id").and_then(Value::as_str).map(str::to_string),
                    version: detail.get("_version").and_then(Value::as_u64),
                    status: detail
                        .get("status")
                        .and_then(Value::as_u64)
                        .and_then(|s| u16::try_from(s).ok())
                        .unwrap_or(0),
                    error: detail.get("error").cloned(),
                }
            })
            .collect();
        Ok(Self {
            took: raw.took,
            errors: raw.errors,
            items,
        })
    }

    pub fn took(&self) -> Option<u64> {
        self.took
    }

    pub fn items(&self) -> &[BulkItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.errors || self.items.iter().any(|i| !i.is_ok())
    }

    pub fn is_ok(&self) -> bool {
        !self.has_error()
    }

    /// 💬 First item error, or an empty string when all went well.
    pub fn error(&self) -> String {
        self.items
            .iter()
            .find_map(BulkItem::error_reason)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_a_fully_loaded_document_becomes_beautiful_bulk_format() -> Result<()> {
        let doc = Document::new(json!({"meaning_of_life": 42}))
            .with_id("doc-42")
            .with_index("the-answer-index")
            .with_routing("route-66");

        let out = Action::index(&doc)?.to_ndjson()?;
        let lines: Vec<&str> = out.split('\n').collect();

        // 🎯 two lines and the sacred trailing newline
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "");
        let action: Value = serde_json::from_str(lines[0])?;
        assert_eq!(action["index"]["_id"], "doc-42");
        assert_eq!(action["index"]["_index"], "the-answer-index");
        assert_eq!(action["index"]["routing"], "route-66");
        assert_eq!(lines[1], r#"{"meaning_of_life":42}"#);
        Ok(())
    }

    #[test]
    fn the_one_where_a_naked_document_gets_an_empty_action() -> Result<()> {
        let out = Action::index(&Document::new(json!({"doc": 1})))?.to_ndjson()?;
        assert_eq!(out, "{\"index\":{}}\n{\"doc\":1}\n");
        Ok(())
    }

    #[test]
    fn the_one_where_delete_travels_light() -> Result<()> {
        let out = Action::delete("7", Some("test"), None).to_ndjson()?;
        assert_eq!(out, "{\"delete\":{\"_id\":\"7\",\"_index\":\"test\"}}\n");
        Ok(())
    }

    #[test]
    fn the_one_where_update_without_an_id_is_refused() {
        let doc = Document::new(json!({"a": 1})).with_index("test");
        assert!(matches!(
            Action::update(&doc),
            Err(ElastxError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn the_one_where_update_lines_wrap_the_doc() -> Result<()> {
        let doc = Document::new(json!({"name": "AnonCoin"}))
            .with_id("1")
            .with_index("cryptocurrencies")
            .with_retry_on_conflict(2);
        let out = Action::update(&doc)?.to_ndjson()?;
        let lines: Vec<&str> = out.lines().collect();
        let action: Value = serde_json::from_str(lines[0])?;
        assert_eq!(action["update"]["retry_on_conflict"], 2);
        let source: Value = serde_json::from_str(lines[1])?;
        assert_eq!(source, json!({"doc": {"name": "AnonCoin"}}));
        Ok(())
    }

    #[test]
    fn the_one_where_a_date_math_index_stays_raw_in_the_body_but_escaped_in_the_path() -> Result<()> {
        let mut bulk = Bulk::new();
        bulk.set_index("<test-{now/d}>");
        bulk.add_documents(
            &[
                Document::new(json!({"name": "one"})).with_id("1").with_index("<test-{now/d}>"),
                Document::new(json!({"name": "two"})).with_id("2"),
            ],
            OpType::Index,
        )?;

        let request = bulk.to_request()?;
        assert_eq!(request.path(), "/<test-{now/d}>/_bulk");
        let body = bulk.to_ndjson()?;
        assert!(body.contains(r#""_index":"<test-{now/d}>""#));
        Ok(())
    }

    #[test]
    fn the_one_where_an_indexless_bulk_is_a_configuration_problem() {
        let mut bulk = Bulk::new();
        bulk.add_action(Action::delete("1", None, None));
        assert!(matches!(
            bulk.to_request(),
            Err(ElastxError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Bulk::new().to_request(),
            Err(ElastxError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn the_one_where_a_hollow_item_keeps_its_seat() -> Result<()> {
        let response = Response::new(
            200,
            json!({
                "errors": false,
                "items": [
                    {"index": {"_id": "a", "_version": 1, "status": 201}},
                    {},
                    {"index": {"_id": "c", "_version": 1, "status": 201}}
                ]
            })
            .to_string(),
        );
        let set = ResponseSet::from_response(&response)?;

        assert_eq!(set.len(), 3);
        assert_eq!(set.items()[0].id.as_deref(), Some("a"));
        assert!(!set.items()[1].is_ok());
        assert!(set.items()[1].id.is_none());
        assert_eq!(set.items()[2].id.as_deref(), Some("c"));
        assert!(set.has_error());
        assert!(set.error().contains("no operation"));
        Ok(())
    }

    #[test]
    fn the_one_where_the_response_set_reads_the_room() -> Result<()> {
        let happy = Response::new(
            200,
            json!({
                "took": 3,
                "errors": false,
                "items": [
                    {"index": {"_index": "test", "_id": "1", "_version": 1, "status": 201}},
                    {"index": {"_index": "test", "_id": "2", "_version": 1, "status": 201}}
                ]
            })
            .to_string(),
        );
        let set = ResponseSet::from_response(&happy)?;
        assert_eq!(set.len(), 2);
        assert!(set.is_ok());
        assert!(!set.has_error());
        assert_eq!(set.error(), "");
        assert_eq!(set.items()[1].id.as_deref(), Some("2"));

        let sad = Response::new(
            200,
            json!({
                "took": 1,
                "errors": true,
                "items": [
                    {"update": {"_index": "test", "_id": "9", "status": 404,
                        "error": {"type": "document_missing_exception", "reason": "[9]: document missing"}}}
                ]
            })
            .to_string(),
        );
        let set = ResponseSet::from_response(&sad)?;
        assert!(set.has_error());
        assert_eq!(set.error(), "[9]: document missing");
        assert_eq!(set.items()[0].op, "update");
        Ok(())
    }
}
