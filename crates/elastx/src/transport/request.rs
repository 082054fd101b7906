//! 📨 Request attempts: method, path, params, body. Built once, sent to whichever node the pool picks.

use reqwest::Method;
use serde_json::Value;
use url::Url;

use super::node_pool::NodeAddress;
use crate::error::{ElastxError, Result};

/// 📦 What goes in the request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// 🦆 A single JSON document.
    Json(Value),
    /// 📜 Newline-delimited JSON, already framed (the `_bulk` dialect).
    NdJson(String),
}

impl RequestBody {
    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Json(_) => "application/json",
            // ⚠️ not application/json. ES will 406 you for that on _bulk.
            RequestBody::NdJson(_) => "application/x-ndjson",
        }
    }

    pub fn render(&self) -> Result<String> {
        match self {
            RequestBody::Json(value) => Ok(serde_json::to_string(value)?),
            RequestBody::NdJson(raw) => Ok(raw.clone()),
        }
    }
}

/// 📨 One request, not yet bound to a node.
///
/// Path segments are stored raw and percent-encoded only when a URL is built for a node,
/// so date-math index names like `<logs-{now/d}>` reach the server intact.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestAttempt {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<RequestBody>,
}

impl RequestAttempt {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::GET, segments)
    }

    pub fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::POST, segments)
    }

    pub fn put<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::PUT, segments)
    }

    pub fn delete<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::DELETE, segments)
    }

    pub fn head<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::HEAD, segments)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn with_ndjson(mut self, body: String) -> Self {
        self.body = Some(RequestBody::NdJson(body));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// 🛣️ The unencoded path, `/` joined. `/` for the root. Good for logs and assertions.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// 🧭 The full URL for this attempt against one node.
    pub fn url_for(&self, node: &NodeAddress) -> Result<Url> {
        let mut url = node.base_url()?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ElastxError::invalid(format!("node '{}' cannot carry a path", node))
            })?;
            path.pop_if_empty();
            path.extend(self.segments.iter());
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node() -> NodeAddress {
        "localhost:9200".parse().expect("💀 localhost should parse")
    }

    #[test]
    fn the_one_where_the_root_path_is_just_a_slash() {
        let attempt = RequestAttempt::get(Vec::<String>::new());
        assert_eq!(attempt.path(), "/");
        let url = attempt.url_for(&node()).expect("💀 root url should build");
        assert_eq!(url.as_str(), "http://localhost:9200/");
    }

    #[test]
    fn the_one_where_segments_and_params_land_in_the_url() {
        let attempt = RequestAttempt::post(["my-index", "_doc", "1"])
            .with_param("refresh", "true")
            .with_param("routing", "r1");
        assert_eq!(attempt.path(), "/my-index/_doc/1");
        let url = attempt.url_for(&node()).expect("💀 url should build");
        assert_eq!(
            url.as_str(),
            "http://localhost:9200/my-index/_doc/1?refresh=true&routing=r1"
        );
    }

    #[test]
    fn the_one_where_date_math_index_names_are_escaped_in_the_uri() {
        let attempt = RequestAttempt::post(["<test-{now/d}>", "_refresh"]);
        let url = attempt.url_for(&node()).expect("💀 url should build");
        assert_eq!(
            url.path(),
            "/%3Ctest-%7Bnow%2Fd%7D%3E/_refresh"
        );
        // -- 🪞 the raw path keeps the original name for humans
        assert_eq!(attempt.path(), "/<test-{now/d}>/_refresh");
    }

    #[test]
    fn the_one_where_bodies_know_their_content_type() {
        let json_body = RequestBody::Json(json!({"query": {"match_all": {}}}));
        assert_eq!(json_body.content_type(), "application/json");
        assert_eq!(
            json_body.render().expect("💀 json should render"),
            r#"{"query":{"match_all":{}}}"#
        );

        let nd = RequestBody::NdJson("{\"index\":{}}\n{}\n".to_string());
        assert_eq!(nd.content_type(), "application/x-ndjson");
    }
}
