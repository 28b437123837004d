extern crate self as optimistic_store;

mod config;
pub mod dashboard;
mod entity;
mod error;
#[cfg(feature = "mock-server")]
pub mod mock;
pub mod notify;
pub mod pricing;
mod remote;
mod store;
mod validate;

pub use config::{
    ClientConfig, ConfigError, DEFAULT_MUTATION_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, ENV_BASE_URL,
    ENV_MUTATION_TIMEOUT, ENV_REQUEST_TIMEOUT, ENV_TOKEN,
};
pub use entity::{merge_fields, to_fields, Entity, EntityId, Fields, Record, Resource, LOCAL_ID_KEY};
pub use error::{RemoteError, StoreError};
#[cfg(feature = "emitter")]
pub use notify::EmitterNotifier;
pub use notify::{BufferNotifier, LogNotifier, NoopNotifier, Notification, Notifier, Severity};
#[cfg(feature = "http")]
pub use remote::HttpRemote;
pub use remote::{
    CollectionRemote, InMemoryRemote, NoToken, RemoteCall, RemoteOp, StaticToken, TokenSource,
};
pub use store::{CollectionStore, Snapshot, StoreBuilder, StoreStatus};
pub use validate::{AcceptAll, RequiredFields, Validator};

// Derive macro for `Entity` + `Resource` on typed collection members
pub use optimistic_store_macros::Resource;

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
