//! 📡 The real thing: reqwest, a socket, and a node that may or may not pick up.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{Connection, SendError};
use crate::error::{ElastxError, Result};
use crate::transport::TransportConfig;
use crate::transport::node_pool::NodeAddress;
use crate::transport::request::RequestAttempt;
use crate::transport::response::Response;

/// 🔒 How we introduce ourselves. API key beats basic auth; this is not a democracy.
#[derive(Debug, Clone)]
enum Auth {
    None,
    Basic {
        username: String,
        password: Option<String>,
    },
    ApiKey(String),
}

/// 📡 HTTP connection backed by one shared `reqwest::Client` (and its connection pool).
#[derive(Debug, Clone)]
pub struct HttpConnection {
    client: reqwest::Client,
    auth: Auth,
}

impl HttpConnection {
    /// 🚀 Build the HTTP client with the configured connect and read timeouts.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                ElastxError::Http(format!(
                    "the HTTP client refused to be born (TLS stack? system certs?): {}",
                    e
                ))
            })?;

        let auth = match (&config.api_key, &config.username) {
            (Some(api_key), _) => Auth::ApiKey(api_key.clone()),
            (None, Some(username)) => Auth::Basic {
                username: username.clone(),
                password: config.password.clone(),
            },
            (None, None) => Auth::None,
        };

        Ok(Self { client, auth })
    }
}

#[async_trait]
impl Connection for HttpConnection {
    async fn send(&self, node: &NodeAddress, request: &RequestAttempt) -> Result<Response, SendError> {
        let url = request.url_for(node).map_err(SendError::Fatal)?;
        debug!("📡 {} {}", request.method(), url);

        let mut builder = self.client.request(request.method().clone(), url);
        builder = match &self.auth {
            Auth::None => builder,
            Auth::ApiKey(key) => builder.header("Authorization", format!("ApiKey {}", key)),
            Auth::Basic { username, password } => builder.basic_auth(username, password.as_ref()),
        };
        if let Some(body) = request.body() {
            let rendered = body.render().map_err(SendError::Fatal)?;
            builder = builder
                .header("Content-Type", body.content_type())
                .body(rendered);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                SendError::Fatal(ElastxError::Http(e.to_string()))
            } else {
                // -- 📡 refused, reset, timed out, DNS shrugged: the node is the problem
                SendError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        // -- ⚠️ a node that dies halfway through the body is still a node that died
        let body = response
            .text()
            .await
            .map_err(|e| SendError::Unreachable(e.to_string()))?;
        trace!("✅ {} answered {} ({} bytes)", node, status, body.len());
        Ok(Response::new(status, body))
    }
}
