use std::error::Error;
use std::fmt;

use crate::entity::EntityId;

/// Failure reported by a remote collection endpoint or its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The request never produced a response (connect, DNS, reset...).
    Network(String),
    /// No response within the allotted time.
    Timeout,
    /// Non-2xx response not covered by a more specific variant.
    Rejected { status: u16, message: String },
    /// The target does not exist remotely.
    NotFound(String),
    /// The payload was rejected (400 / 422).
    Validation(String),
    /// A 2xx response whose body could not be understood.
    Decode(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Network(msg) => write!(f, "network error: {}", msg),
            RemoteError::Timeout => write!(f, "request timed out"),
            RemoteError::Rejected { status, message } => {
                write!(f, "remote rejected request ({}): {}", status, message)
            }
            RemoteError::NotFound(what) => write!(f, "not found: {}", what),
            RemoteError::Validation(msg) => write!(f, "validation failed: {}", msg),
            RemoteError::Decode(msg) => write!(f, "could not decode response: {}", msg),
        }
    }
}

impl Error for RemoteError {}

impl RemoteError {
    /// Map this error to an HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            RemoteError::Network(_) => 502,
            RemoteError::Timeout => 504,
            RemoteError::Rejected { status, .. } => *status,
            RemoteError::NotFound(_) => 404,
            RemoteError::Validation(_) => 422,
            RemoteError::Decode(_) => 502,
        }
    }
}

/// Error type for collection store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The remote call failed; local state has been rolled back.
    Remote(RemoteError),
    /// The payload was rejected by the store's validator before any change.
    Validation(String),
    /// The target id is not in the collection.
    UnknownId(EntityId),
    /// The target id belongs to a create the server has not confirmed yet.
    Unconfirmed(EntityId),
    /// An entity could not be built from or turned into JSON.
    Serde(String),
    /// Store state lock poisoned during the named operation.
    LockPoisoned(&'static str),
    /// The store was disposed.
    Disposed,
    /// The background task driving a mutation panicked or was cancelled.
    Task(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Remote(e) => write!(f, "{}", e),
            StoreError::Validation(msg) => write!(f, "invalid payload: {}", msg),
            StoreError::UnknownId(id) => write!(f, "no entity with id {} in collection", id),
            StoreError::Unconfirmed(id) => {
                write!(f, "entity {} has not been confirmed by the server yet", id)
            }
            StoreError::Serde(msg) => write!(f, "entity serialization error: {}", msg),
            StoreError::LockPoisoned(operation) => {
                write!(f, "store lock poisoned during {}", operation)
            }
            StoreError::Disposed => write!(f, "store has been disposed"),
            StoreError::Task(msg) => write!(f, "mutation task failed: {}", msg),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RemoteError> for StoreError {
    fn from(err: RemoteError) -> Self {
        StoreError::Remote(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(err.to_string())
    }
}
