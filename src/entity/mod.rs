//! Entities - identity plus opaque payload.
//!
//! An entity is anything that serializes to a JSON object with an `id`
//! field. The store never looks inside the payload; it only needs the id for
//! identity and the JSON form for shallow merges.
//!
//! ## Example
//!
//! ```ignore
//! use optimistic_store::{EntityId, Resource};
//!
//! #[derive(Clone, Serialize, Deserialize, Resource)]
//! #[resource(collection = "guests")]
//! pub struct Guest {
//!     pub id: EntityId,
//!     pub name: String,
//! }
//! ```

mod id;
mod merge;
mod record;

use serde::{de::DeserializeOwned, Serialize};

pub use id::{EntityId, LOCAL_ID_KEY};
pub use merge::{merge_fields, to_fields};
pub use record::Record;

/// A JSON object: the shape of drafts, patches and wire entities.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Trait for types that can live in a collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Returns the unique identifier for this entity.
    fn id(&self) -> &EntityId;
}

/// An entity bound to a named remote collection (e.g. "listings").
pub trait Resource: Entity {
    /// The collection name; the last path segment of the REST endpoint.
    const COLLECTION: &'static str;
}
