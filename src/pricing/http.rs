use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{build_prompt, parse_suggestion, PriceSuggester, PriceSuggestion, PricingError, PricingRequest};
use crate::config::ClientConfig;
use crate::error::RemoteError;
use crate::remote::http::{map_reqwest_error, status_error};
use crate::remote::{NoToken, StaticToken, TokenSource};

/// Path of the suggestion endpoint under the dashboard API base URL.
pub const SUGGEST_PATH: &str = "pricing/suggest";

#[derive(Serialize)]
struct SuggestBody<'a> {
    prompt: String,
    #[serde(flatten)]
    request: &'a PricingRequest,
}

/// Asks an HTTP endpoint for a suggestion.
///
/// The endpoint receives the structured request plus a ready-made `prompt`,
/// and may answer with the suggestion object itself or with
/// `{ "text": "..." }` wrapping generated text that contains it. The
/// bearer token is read from the `TokenSource` on every request.
#[derive(Clone)]
pub struct HttpPriceSuggester {
    http: Client,
    endpoint: Url,
    auth: Arc<dyn TokenSource>,
}

impl HttpPriceSuggester {
    pub fn new(endpoint: &str) -> Result<Self, PricingError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            RemoteError::Network(format!("invalid pricing endpoint {}: {}", endpoint, e))
        })?;
        Ok(Self {
            http: Client::new(),
            endpoint,
            auth: Arc::new(NoToken),
        })
    }

    /// Target `{base_url}/pricing/suggest` with the configured timeout and token.
    pub fn from_config(config: &ClientConfig) -> Result<Self, PricingError> {
        let base = config.base_url.trim_end_matches('/');
        let mut suggester = Self::new(&format!("{}/{}", base, SUGGEST_PATH))?;
        suggester.http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("optimistic_store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(match &config.bearer_token {
            Some(token) => suggester.with_token(token.clone()),
            None => suggester,
        })
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.with_token_source(Arc::new(StaticToken::new(token)))
    }

    /// Share the token source of the collection remotes, so a rotated
    /// session token reaches this endpoint too.
    pub fn with_token_source(mut self, auth: Arc<dyn TokenSource>) -> Self {
        self.auth = auth;
        self
    }
}

#[async_trait]
impl PriceSuggester for HttpPriceSuggester {
    async fn suggest(&self, request: &PricingRequest) -> Result<PriceSuggestion, PricingError> {
        let body = SuggestBody {
            prompt: build_prompt(request),
            request,
        };
        let mut call = self.http.post(self.endpoint.clone()).json(&body);
        if let Some(token) = self.auth.bearer_token() {
            call = call.bearer_auth(token);
        }

        let res = call.send().await.map_err(map_reqwest_error)?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &text, self.endpoint.path().to_string()).into());
        }

        let value: Value = res
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        debug!(endpoint = %self.endpoint, "price suggestion received");
        read_suggestion(value)
    }
}

fn read_suggestion(value: Value) -> Result<PriceSuggestion, PricingError> {
    if let Some(text) = value.get("text").and_then(Value::as_str) {
        return parse_suggestion(text);
    }
    serde_json::from_value::<PriceSuggestion>(value)
        .map_err(|e| PricingError::InvalidSuggestion(e.to_string()))?
        .validated()
}
