//! 📂 Index: one named index and the operations that only make sense against it.
//!
//! `Index<'a>` is a short-lived handle holding `&'a mut Client`. Grab it, do your thing,
//! drop it. The client can't be used for anything else in the meantime, which is the point:
//! one request at a time, no liveness races.
//!
//! Index names travel raw; the transport percent-encodes them per path segment, so
//! `<logs-{now/d}>` arrives as a single segment, not three. 🦆

use serde_json::Value;
use tracing::{debug, info};

use crate::bulk::{OpType, ResponseSet};
use crate::client::Client;
use crate::document::Document;
use crate::error::{ElastxError, Result};
use crate::transport::RequestAttempt;

/// 📂 A handle on one index, borrowing the client that created it.
#[derive(Debug)]
pub struct Index<'a> {
    client: &'a mut Client,
    name: String,
}

impl<'a> Index<'a> {
    pub(crate) fn new(client: &'a mut Client, name: String) -> Self {
        Self { client, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 🏗️ `PUT /{index}` with settings/mappings. With `recreate`, a missing index on the
    /// way down is fine; any other failure is not.
    pub async fn create(&mut self, settings: Value, recreate: bool) -> Result<Value> {
        if recreate {
            match self.delete().await {
                Ok(_) | Err(ElastxError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        info!("🏗️ Creating index {}", self.name);
        self.client
            .send_json(RequestAttempt::put([self.name.as_str()]).with_json(settings))
            .await
    }

    /// 🗑️ `DELETE /{index}`. A missing index is [`ElastxError::NotFound`].
    pub async fn delete(&mut self) -> Result<Value> {
        let response = self
            .client
            .execute(RequestAttempt::delete([self.name.as_str()]))
            .await?;
        if response.status() == 404 {
            return Err(ElastxError::NotFound(format!("index {}", self.name)));
        }
        response.error_for_status()?.as_value()
    }

    /// 🔍 `HEAD /{index}`: 200 is yes, 404 is no, anything else is somebody else's problem.
    pub async fn exists(&mut self) -> Result<bool> {
        let response = self
            .client
            .execute(RequestAttempt::head([self.name.as_str()]))
            .await?;
        match response.status() {
            404 => Ok(false),
            _ => response.error_for_status().map(|_| true),
        }
    }

    /// 🔄 `POST /{index}/_refresh`, so what you just wrote shows up in searches.
    pub async fn refresh(&mut self) -> Result<Value> {
        self.client
            .send_json(RequestAttempt::post([self.name.as_str(), "_refresh"]))
            .await
    }

    /// 📄 Index one document: `PUT /{index}/_doc/{id}` or `POST /{index}/_doc` without an id.
    ///
    /// The document's own index is overwritten with this one. Routing and pipeline become
    /// query params. With auto-populate, the assigned id and version are written back.
    pub async fn add_document(&mut self, doc: &mut Document) -> Result<Value> {
        doc.set_index(self.name.as_str());
        let source = doc.source()?.clone();
        let request = match doc.id() {
            Some(id) => RequestAttempt::put([self.name.as_str(), "_doc", id]),
            None => RequestAttempt::post([self.name.as_str(), "_doc"]),
        };
        let params = doc
            .routing()
            .map(|r| ("routing", r.to_string()))
            .into_iter()
            .chain(doc.pipeline().map(|p| ("pipeline", p.to_string())));
        let request = request.with_params(params).with_json(source);

        let result = self.client.send_json(request).await?;
        if self.client.auto_populate(doc) {
            if let Some(id) = result.get("_id").and_then(Value::as_str).filter(|_| !doc.has_id()) {
                doc.set_id(id);
            }
            if let Some(version) = result.get("_version").and_then(Value::as_u64) {
                doc.set_version(version);
            }
        }
        Ok(result)
    }

    /// 📄 Bulk-index documents into this index. Documents that name their own index keep it.
    pub async fn add_documents(
        &mut self,
        docs: &mut [Document],
        params: &[(&str, &str)],
    ) -> Result<ResponseSet> {
        self.client
            .add_documents_to(Some(self.name.as_str()), docs, params)
            .await
    }

    pub async fn update_documents(
        &mut self,
        docs: &[Document],
        params: &[(&str, &str)],
    ) -> Result<ResponseSet> {
        self.client
            .bulk_documents(Some(self.name.as_str()), docs, OpType::Update, params)
            .await
    }

    pub async fn delete_documents(
        &mut self,
        docs: &[Document],
        params: &[(&str, &str)],
    ) -> Result<ResponseSet> {
        self.client
            .bulk_documents(Some(self.name.as_str()), docs, OpType::Delete, params)
            .await
    }

    /// 📄 `GET /{index}/_doc/{id}`. Missing documents are [`ElastxError::NotFound`].
    pub async fn get_document(&mut self, id: &str) -> Result<Document> {
        let response = self
            .client
            .execute(RequestAttempt::get([self.name.as_str(), "_doc", id]))
            .await?;
        if response.status() == 404 {
            return Err(ElastxError::NotFound(format!(
                "document {} in index {}",
                id, self.name
            )));
        }
        let body = response.error_for_status()?.as_value()?;
        if body.get("found").and_then(Value::as_bool) == Some(false) {
            return Err(ElastxError::NotFound(format!(
                "document {} in index {}",
                id, self.name
            )));
        }
        debug!("📄 Fetched document {} from {}", id, self.name);
        Document::from_get_response(&body)
    }

    /// 🔢 `POST /{index}/_count`, optionally narrowed by a query body.
    pub async fn count(&mut self, query: Option<&Value>) -> Result<u64> {
        let mut request = RequestAttempt::post([self.name.as_str(), "_count"]);
        if let Some(query) = query {
            request = request.with_json(query.clone());
        }
        let body = self.client.send_json(request).await?;
        Ok(body.get("count").and_then(Value::as_u64).unwrap_or(0))
    }

    /// 🔍 `POST /{index}/_search`.
    pub async fn search(&mut self, body: &Value) -> Result<Value> {
        self.client.search(Some(self.name.as_str()), body).await
    }

    /// 📊 `GET /{index}/_stats`.
    pub async fn stats(&mut self) -> Result<Value> {
        self.client
            .indices_stats(Some(self.name.as_str()), &[])
            .await
    }
}
