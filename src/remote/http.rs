//! HTTP transport for the collection contract (JSON over HTTP, bearer auth).
//!
//! Requires the `http` feature. Uses reqwest.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use optimistic_store::{ClientConfig, HttpRemote};
//!
//! let config = ClientConfig::from_env()?;
//! let remote = Arc::new(HttpRemote::from_config(&config)?);
//! let listings = CollectionStore::<Listing>::for_resource(remote);
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::Value;

use super::auth::{NoToken, StaticToken, TokenSource};
use super::CollectionRemote;
use crate::config::ClientConfig;
use crate::entity::{EntityId, Fields};
use crate::error::RemoteError;

/// A `CollectionRemote` speaking REST to `{base_url}/{collection}[/{id}]`.
#[derive(Clone)]
pub struct HttpRemote {
    http: Client,
    base_url: Url,
    auth: Arc<dyn TokenSource>,
}

impl HttpRemote {
    /// Create a remote for `base_url` with a default client and no auth.
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a remote using an existing reqwest client.
    pub fn with_client(http: Client, base_url: &str) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RemoteError::Network(format!("invalid base url {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::Network(format!(
                "base url {} cannot carry a path",
                base_url
            )));
        }
        Ok(Self {
            http,
            base_url,
            auth: Arc::new(NoToken),
        })
    }

    /// Build from configuration: base URL, request timeout, optional token.
    pub fn from_config(config: &ClientConfig) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("optimistic_store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let remote = Self::with_client(http, &config.base_url)?;
        Ok(match &config.bearer_token {
            Some(token) => remote.with_token_source(Arc::new(StaticToken::new(token.clone()))),
            None => remote,
        })
    }

    /// Attach a bearer token source consulted on every request.
    pub fn with_token_source(mut self, auth: Arc<dyn TokenSource>) -> Self {
        self.auth = auth;
        self
    }

    fn url(&self, collection: &str, id: Option<&EntityId>) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RemoteError::Network("base url cannot carry a path".into()))?;
            segments.pop_if_empty().push(collection);
            if let Some(id) = id {
                segments.push(&id.to_string());
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl CollectionRemote for HttpRemote {
    async fn list(&self, collection: &str) -> Result<Vec<Value>, RemoteError> {
        let url = self.url(collection, None)?;
        let res = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match read_json(res, collection.to_string()).await? {
            Value::Array(items) => Ok(items),
            other => Err(RemoteError::Decode(format!(
                "expected an array from GET /{}, got {}",
                collection, other
            ))),
        }
    }

    async fn create(&self, collection: &str, draft: &Fields) -> Result<Value, RemoteError> {
        let url = self.url(collection, None)?;
        let res = self
            .authorize(self.http.post(url).json(draft))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        read_json(res, collection.to_string()).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &EntityId,
        body: &Fields,
    ) -> Result<Value, RemoteError> {
        let url = self.url(collection, Some(id))?;
        let res = self
            .authorize(self.http.put(url).json(body))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        read_json(res, format!("{}/{}", collection, id)).await
    }

    async fn delete(&self, collection: &str, id: &EntityId) -> Result<(), RemoteError> {
        let url = self.url(collection, Some(id))?;
        let res = self
            .authorize(self.http.delete(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        read_json(res, format!("{}/{}", collection, id)).await?;
        Ok(())
    }
}

/// Decode a response body, mapping non-2xx statuses onto `RemoteError`.
/// An empty 2xx body decodes as `null`.
async fn read_json(res: Response, target: String) -> Result<Value, RemoteError> {
    let status = res.status();
    if status.is_success() {
        let bytes = res.bytes().await.map_err(map_reqwest_error)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        return serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()));
    }

    let body = res.text().await.unwrap_or_default();
    Err(status_error(status.as_u16(), &body, target))
}

pub(crate) fn status_error(status: u16, body: &str, target: String) -> RemoteError {
    match status {
        404 => RemoteError::NotFound(target),
        400 | 422 => RemoteError::Validation(error_message(body)),
        _ => RemoteError::Rejected {
            status,
            message: error_message(body),
        },
    }
}

/// Pull a human-readable message out of an error body.
///
/// Prefers `{"error": "..."}` or `{"message": "..."}`, falls back to the raw
/// text.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(Value::String(msg)) = fields.get(key) {
                return msg.clone();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.to_string()
    }
}

pub(crate) fn map_reqwest_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Network(e.to_string())
    }
}
