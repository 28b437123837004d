//! Remote - the REST collection contract the store reads and writes through.
//!
//! ```text
//! GET    /{collection}        -> [entity, ...]
//! POST   /{collection}        -> created entity (with server id)
//! PUT    /{collection}/{id}   -> updated entity
//! DELETE /{collection}/{id}   -> confirmation
//! ```
//!
//! Implementations deal in raw JSON; decoding into typed entities is the
//! store's job.

mod auth;
#[cfg(feature = "http")]
pub(crate) mod http;
mod in_memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::entity::{EntityId, Fields};
use crate::error::RemoteError;

pub use auth::{NoToken, StaticToken, TokenSource};
#[cfg(feature = "http")]
pub use http::HttpRemote;
pub use in_memory::{InMemoryRemote, RemoteCall, RemoteOp};

/// A remote source of truth for named collections.
#[async_trait]
pub trait CollectionRemote: Send + Sync {
    /// Fetch the full collection.
    async fn list(&self, collection: &str) -> Result<Vec<Value>, RemoteError>;

    /// Create an entity from a payload without `id`; returns the stored entity.
    async fn create(&self, collection: &str, draft: &Fields) -> Result<Value, RemoteError>;

    /// Replace the entity at `id` with `body`; returns the stored entity.
    async fn update(
        &self,
        collection: &str,
        id: &EntityId,
        body: &Fields,
    ) -> Result<Value, RemoteError>;

    /// Delete the entity at `id`.
    async fn delete(&self, collection: &str, id: &EntityId) -> Result<(), RemoteError>;
}

#[async_trait]
impl<R: CollectionRemote + ?Sized> CollectionRemote for std::sync::Arc<R> {
    async fn list(&self, collection: &str) -> Result<Vec<Value>, RemoteError> {
        (**self).list(collection).await
    }

    async fn create(&self, collection: &str, draft: &Fields) -> Result<Value, RemoteError> {
        (**self).create(collection, draft).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &EntityId,
        body: &Fields,
    ) -> Result<Value, RemoteError> {
        (**self).update(collection, id, body).await
    }

    async fn delete(&self, collection: &str, id: &EntityId) -> Result<(), RemoteError> {
        (**self).delete(collection, id).await
    }
}
