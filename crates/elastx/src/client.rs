//! # 🛰️ THE CLIENT
//!
//! The front door. Owns the [`Transport`] (and through it the node pool), knows how
//! documents like to be populated, and turns "index these three things" into the right
//! `_bulk` body on the right path.
//!
//! Every operation takes `&mut self` and awaits one request at a time. Liveness bookkeeping
//! never races because there is nothing to race with. 🦆

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::app_config::ClientConfig;
use crate::bulk::{Action, Bulk, OpType, ResponseSet};
use crate::document::{Document, DocumentConfig, UpdatePayload};
use crate::error::{ElastxError, Result};
use crate::index::Index;
use crate::transport::{
    ConnectionBackend, Node, NodePool, RequestAttempt, Response, Transport,
};

/// 🛰️ An Elasticsearch client over a pool of nodes.
#[derive(Debug)]
pub struct Client {
    transport: Transport,
    document_config: DocumentConfig,
}

impl Client {
    /// 🚀 A client speaking real HTTP to the configured hosts.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = Transport::new(&config.hosts, &config.transport)?;
        info!(
            "🛰️ Client ready: {} node(s) configured ({})",
            config.hosts.len(),
            config.hosts.join(", ")
        );
        Ok(Self {
            transport,
            document_config: config.document.clone(),
        })
    }

    /// 🔌 Same configuration, different connection. Tests hand in an in-memory one.
    pub fn with_connection(
        config: &ClientConfig,
        connection: impl Into<ConnectionBackend>,
    ) -> Result<Self> {
        let pool = NodePool::from_hosts(
            &config.hosts,
            config.transport.selection,
            config.transport.exhaustion,
        )?;
        Ok(Self {
            transport: Transport::with_connection(pool, connection),
            document_config: config.document.clone(),
        })
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// 📋 The node pool's current view of the cluster, in configured order.
    pub fn nodes(&self) -> &[Node] {
        self.transport.node_pool().nodes()
    }

    pub fn last_request(&self) -> Option<&RequestAttempt> {
        self.transport.last_request()
    }

    pub fn last_response(&self) -> Option<&Response> {
        self.transport.last_response()
    }

    pub(crate) fn auto_populate(&self, doc: &Document) -> bool {
        self.document_config.auto_populate || doc.auto_populate()
    }

    /// 📡 Send a prepared request with failover. Any status comes back as a [`Response`].
    pub async fn execute(&mut self, request: RequestAttempt) -> Result<Response> {
        self.transport.execute(request).await
    }

    /// 🧪 Raw escape hatch: method, `/`-separated path, query params, optional JSON body.
    ///
    /// Path pieces are split on `/`, so a name that itself contains a slash (date math like
    /// `<logs-{now/d}>`) needs [`Client::execute`] with explicit segments instead.
    pub async fn request(
        &mut self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Response> {
        let mut request =
            RequestAttempt::new(method, path.split('/')).with_params(params.iter().copied());
        if let Some(body) = body {
            request = request.with_json(body);
        }
        self.execute(request).await
    }

    /// 📦 Send, require a 2xx, and hand back the body as JSON.
    pub(crate) async fn send_json(&mut self, request: RequestAttempt) -> Result<Value> {
        self.execute(request).await?.error_for_status()?.as_value()
    }

    /// 🏷️ `GET /` and read `version.number`.
    pub async fn version(&mut self) -> Result<String> {
        let root = self
            .send_json(RequestAttempt::get(std::iter::empty::<String>()))
            .await?;
        root.pointer("/version/number")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ElastxError::NotFound("version.number in the root endpoint response".to_string())
            })
    }

    /// 📂 A handle on one index. Borrows the client for as long as you hold it.
    pub fn index(&mut self, name: impl Into<String>) -> Index<'_> {
        Index::new(self, name.into())
    }

    /// 🚚 Send a bulk. Item-level failures are reported in the [`ResponseSet`], not as an `Err`.
    pub async fn bulk(&mut self, bulk: &Bulk) -> Result<ResponseSet> {
        let response = self.execute(bulk.to_request()?).await?.error_for_status()?;
        let set = ResponseSet::from_response(&response)?;
        if set.has_error() {
            warn!(
                "⚠️ Bulk of {} action(s) came back with errors; first one: {}",
                bulk.len(),
                set.error()
            );
        } else {
            debug!("✅ Bulk of {} action(s) went through", bulk.len());
        }
        Ok(set)
    }

    /// 📄 Index documents through `_bulk`. Each document must name its index.
    ///
    /// With auto-populate on (client config or per document), ids and versions from the
    /// response are written back into the documents.
    pub async fn add_documents(
        &mut self,
        docs: &mut [Document],
        params: &[(&str, &str)],
    ) -> Result<ResponseSet> {
        self.add_documents_to(None, docs, params).await
    }

    pub(crate) async fn add_documents_to(
        &mut self,
        index: Option<&str>,
        docs: &mut [Document],
        params: &[(&str, &str)],
    ) -> Result<ResponseSet> {
        let set = self
            .bulk_documents(index, docs, OpType::Index, params)
            .await?;
        for (doc, item) in docs.iter_mut().zip(set.items()) {
            if !self.auto_populate(doc) {
                continue;
            }
            if let Some(id) = item.id.as_ref().filter(|_| !doc.has_id()) {
                doc.set_id(id.clone());
            }
            if let Some(version) = item.version {
                doc.set_version(version);
            }
        }
        Ok(set)
    }

    /// ✏️ Partial updates through `_bulk`. Each document needs an id and an index.
    pub async fn update_documents(
        &mut self,
        docs: &[Document],
        params: &[(&str, &str)],
    ) -> Result<ResponseSet> {
        self.bulk_documents(None, docs, OpType::Update, params).await
    }

    /// 🗑️ Deletes through `_bulk`. Each document needs an id and an index.
    pub async fn delete_documents(
        &mut self,
        docs: &[Document],
        params: &[(&str, &str)],
    ) -> Result<ResponseSet> {
        self.bulk_documents(None, docs, OpType::Delete, params).await
    }

    pub(crate) async fn bulk_documents(
        &mut self,
        index: Option<&str>,
        docs: &[Document],
        op: OpType,
        params: &[(&str, &str)],
    ) -> Result<ResponseSet> {
        if docs.is_empty() {
            return Err(ElastxError::invalid("at least one document is needed"));
        }
        let mut bulk = Bulk::new();
        if let Some(index) = index {
            bulk.set_index(index);
        }
        bulk.add_documents(docs, op)?;
        for (key, value) in params {
            bulk.set_request_param(*key, *value);
        }
        self.bulk(&bulk).await
    }

    /// 🗑️ Delete documents by id from one index, optionally with a routing value.
    pub async fn delete_ids<S: AsRef<str>>(
        &mut self,
        ids: &[S],
        index: &str,
        routing: Option<&str>,
    ) -> Result<ResponseSet> {
        if ids.is_empty() {
            return Err(ElastxError::invalid("at least one id is needed to delete anything"));
        }
        let mut bulk = Bulk::new();
        bulk.set_index(index);
        for id in ids {
            bulk.add_action(Action::delete(id.as_ref(), Some(index), routing));
        }
        self.bulk(&bulk).await
    }

    /// ✏️ `POST /{index}/_update/{id}` with a document, a script, or a raw body.
    ///
    /// A 404 (no such document and no upsert) comes back as [`ElastxError::NotFound`].
    pub async fn update_document(
        &mut self,
        id: &str,
        payload: impl Into<UpdatePayload>,
        index: &str,
        params: &[(&str, &str)],
    ) -> Result<Value> {
        let payload = payload.into();
        let request = RequestAttempt::post([index, "_update", id])
            .with_params(params.iter().copied())
            .with_json(payload.to_body()?);
        let response = self.execute(request).await?;
        if response.status() == 404 {
            return Err(ElastxError::NotFound(format!("document {} in {}", id, index)));
        }
        response.error_for_status()?.as_value()
    }

    /// 🔍 `POST /{index}/_search`, or `/_search` across everything.
    pub async fn search(&mut self, index: Option<&str>, body: &Value) -> Result<Value> {
        let request = RequestAttempt::post(index.into_iter().chain(["_search"]))
            .with_json(body.clone());
        self.send_json(request).await
    }

    /// 📊 `GET /_stats`, `/{index}/_stats`, or `/{index}/_stats/{metric,...}`.
    pub async fn indices_stats(&mut self, index: Option<&str>, metrics: &[&str]) -> Result<Value> {
        let metrics = metrics.join(",");
        let segments = index
            .into_iter()
            .chain(["_stats", metrics.as_str()]);
        self.send_json(RequestAttempt::get(segments)).await
    }

    /// 🧹 `POST /_forcemerge` on every index.
    pub async fn forcemerge_all(&mut self) -> Result<Value> {
        self.send_json(RequestAttempt::post(["_forcemerge"])).await
    }
}
