//! Mock dashboard backend: the REST collection contract over an
//! `InMemoryRemote`, plus a heuristic pricing endpoint.
//!
//! Requires the `mock-server` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `GET /health` - `{ "ok": true, "collections": [...] }`, never authenticated.
//! - `GET /:collection` - list.
//! - `POST /:collection` - create from a JSON object; `201` with the stored entity.
//! - `PUT /:collection/:id` - merge the body into the entity.
//! - `DELETE /:collection/:id` - `{ "ok": true }`.
//! - `POST /pricing/suggest` - `{ suggestedPrice, reasoning }`.
//!
//! Errors are `{ "error": message }` with the matching status code.
//!
//! ## Example
//!
//! ```ignore
//! use optimistic_store::{mock, InMemoryRemote};
//!
//! let backend = InMemoryRemote::new();
//! let app = mock::MockServer::new(backend).with_token("secret").router();
//! // or
//! mock::MockServer::new(InMemoryRemote::new()).serve("127.0.0.1:9002").await?;
//! ```

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::RemoteError;
use crate::pricing::{PriceSuggestion, PricingRequest};
use crate::remote::{CollectionRemote, InMemoryRemote};

/// Configuration of the mock backend.
#[derive(Clone)]
pub struct MockServer {
    remote: InMemoryRemote,
    token: Option<String>,
}

impl MockServer {
    pub fn new(remote: InMemoryRemote) -> Self {
        Self {
            remote,
            token: None,
        }
    }

    /// Require `Authorization: Bearer {token}` on every data route.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build the axum `Router`, to serve directly or compose with other routes.
    pub fn router(self) -> Router {
        router(Arc::new(self))
    }

    /// Serve at `addr` (e.g. `"127.0.0.1:9002"`).
    pub async fn serve(self, addr: &str) -> Result<(), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        debug!(addr, "mock backend listening");
        axum::serve(listener, self.router()).await
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let Some(expected) = &self.token else {
            return Ok(());
        };
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented == Some(expected.as_str()) {
            Ok(())
        } else {
            Err(error_response(
                StatusCode::UNAUTHORIZED,
                "missing or invalid bearer token",
            ))
        }
    }
}

/// Serve `server` at `addr` until the listener fails.
pub async fn serve(server: MockServer, addr: &str) -> Result<(), std::io::Error> {
    server.serve(addr).await
}

/// Build an axum `Router` over the given backend.
pub fn router(server: Arc<MockServer>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/pricing/suggest", post(suggest_handler))
        .route("/:collection", get(list_handler).post(create_handler))
        .route("/:collection/:id", put(update_handler).delete(delete_handler))
        .with_state(server)
}

type Shared = State<Arc<MockServer>>;

async fn health_handler(State(server): Shared) -> impl IntoResponse {
    let mut collections = server.remote.collection_names();
    collections.sort();
    Json(json!({ "ok": true, "collections": collections }))
}

async fn list_handler(
    State(server): Shared,
    Path(collection): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = server.authorize(&headers) {
        return denied;
    }
    match server.remote.list(&collection).await {
        Ok(items) => Json(Value::Array(items)).into_response(),
        Err(e) => remote_error_response(&e),
    }
}

async fn create_handler(
    State(server): Shared,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = server.authorize(&headers) {
        return denied;
    }
    let Value::Object(mut draft) = body else {
        return error_response(StatusCode::BAD_REQUEST, "body must be a JSON object");
    };
    draft.remove("id");
    match server.remote.create(&collection, &draft).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => remote_error_response(&e),
    }
}

async fn update_handler(
    State(server): Shared,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = server.authorize(&headers) {
        return denied;
    }
    let Value::Object(body) = body else {
        return error_response(StatusCode::BAD_REQUEST, "body must be a JSON object");
    };
    let id = server.remote.resolve_id(&collection, &id);
    match server.remote.update(&collection, &id, &body).await {
        Ok(updated) => Json(updated).into_response(),
        Err(e) => remote_error_response(&e),
    }
}

async fn delete_handler(
    State(server): Shared,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = server.authorize(&headers) {
        return denied;
    }
    let id = server.remote.resolve_id(&collection, &id);
    match server.remote.delete(&collection, &id).await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => remote_error_response(&e),
    }
}

async fn suggest_handler(
    State(server): Shared,
    headers: HeaderMap,
    Json(request): Json<PricingRequest>,
) -> Response {
    if let Err(denied) = server.authorize(&headers) {
        return denied;
    }
    Json(heuristic_price(&request)).into_response()
}

/// Price off the best known rate, nudged by occupancy (0.85x empty, 1.15x full).
fn heuristic_price(request: &PricingRequest) -> PriceSuggestion {
    let (base, source) = match (request.market.average_nightly_rate, request.property.current_rate) {
        (Some(avg), _) if avg > 0.0 => (avg, "the local average rate"),
        (_, Some(current)) if current > 0.0 => (current, "the current rate"),
        _ => (100.0, "a default rate"),
    };
    let occupancy = request.market.occupancy_rate.unwrap_or(0.5).clamp(0.0, 1.0);
    let factor = 0.85 + 0.3 * occupancy;
    let price = (base * factor * 100.0).round() / 100.0;

    PriceSuggestion {
        suggested_price: price,
        reasoning: format!(
            "Started from {} ({:.2}) and applied {:.2}x for {:.0}% occupancy.",
            source,
            base,
            factor,
            occupancy * 100.0
        ),
    }
}

fn remote_error_response(err: &RemoteError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match err {
        RemoteError::Validation(msg) => msg.clone(),
        RemoteError::Rejected { message, .. } => message.clone(),
        other => other.to_string(),
    };
    error_response(status, &message)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
