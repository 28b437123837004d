mod resource;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Resource)]
// ============================================================================

/// Derive macro that binds a struct to a remote collection.
///
/// Implements both `optimistic_store::Entity` and `optimistic_store::Resource`.
///
/// # Usage
///
/// ```ignore
/// use optimistic_store::{EntityId, Resource};
///
/// #[derive(Clone, Serialize, Deserialize, Resource)]
/// #[resource(collection = "listings")]
/// pub struct Listing {
///     pub id: EntityId,
///     pub title: String,
/// }
/// ```
///
/// The id field is the one marked `#[resource(id)]`, or else the field named
/// `id`. It must be of type `EntityId`. When no collection is given the
/// snake_case struct name plus `s` is used (`RoomType` -> `room_types`).
#[proc_macro_derive(Resource, attributes(resource))]
pub fn derive_resource(input: TokenStream) -> TokenStream {
    resource::derive_resource(input)
}
