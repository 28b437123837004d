//! InMemoryRemote - ordered in-memory collections for tests, demos and the
//! mock server.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;

use super::CollectionRemote;
use crate::entity::{EntityId, Fields};
use crate::error::RemoteError;

/// The four remote operations, for scripting failures and inspecting calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    List,
    Create,
    Update,
    Delete,
}

/// A call as it arrived at the remote.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub op: RemoteOp,
    pub collection: String,
    pub id: Option<EntityId>,
    pub body: Option<Fields>,
}

/// In-memory remote backed by ordered vectors of JSON objects.
///
/// Ids are sequential integers, or `"{prefix}{n}"` strings when built with
/// [`with_id_prefix`](Self::with_id_prefix). Clone-friendly via Arc; clones
/// share data, scripted failures and the gate.
#[derive(Clone)]
pub struct InMemoryRemote {
    collections: Arc<RwLock<HashMap<String, Vec<Fields>>>>,
    next_id: Arc<AtomicI64>,
    id_prefix: Option<String>,
    failures: Arc<Mutex<HashMap<RemoteOp, VecDeque<RemoteError>>>>,
    calls: Arc<Mutex<Vec<RemoteCall>>>,
    gate: Option<Arc<Semaphore>>,
    latency: Option<Duration>,
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemote {
    /// Create an empty remote with numeric ids starting at 1.
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
            id_prefix: None,
            failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            gate: None,
            latency: None,
        }
    }

    /// Assign string ids such as `"srv-1"`.
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }

    /// Start the id counter at `next`.
    pub fn with_next_id(self, next: i64) -> Self {
        self.next_id.store(next, Ordering::SeqCst);
        self
    }

    /// Delay every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Hold every call until [`release`](Self::release) lets it through.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` held calls proceed. No-op when not gated.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Make the next call of kind `op` fail with `error`.
    pub fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        let mut failures = recover(self.failures.lock());
        failures.entry(op).or_default().push_back(error);
    }

    /// Replace a collection's contents. Objects without an `id` are skipped.
    pub fn seed(&self, collection: &str, items: impl IntoIterator<Item = Value>) {
        let mut stored = Vec::new();
        for item in items {
            let Value::Object(fields) = item else {
                tracing::warn!(collection, "skipping non-object seed item");
                continue;
            };
            match id_of(&fields) {
                Some(EntityId::Int(n)) => {
                    self.next_id.fetch_max(n + 1, Ordering::SeqCst);
                }
                Some(_) => {}
                None => {
                    tracing::warn!(collection, "skipping seed item without id");
                    continue;
                }
            }
            stored.push(fields);
        }
        recover(self.collections.write()).insert(collection.to_string(), stored);
    }

    /// Current contents of a collection, without going through the gate.
    pub fn list_now(&self, collection: &str) -> Vec<Value> {
        recover(self.collections.read())
            .get(collection)
            .map(|items| items.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Names of collections that have been seeded or written to.
    pub fn collection_names(&self) -> Vec<String> {
        recover(self.collections.read()).keys().cloned().collect()
    }

    /// The stored id whose path form is `segment`.
    ///
    /// `"007"` and `"1700000000000"` resolve to the string ids they were
    /// stored as; segments matching nothing fall back to
    /// [`EntityId::from_path_segment`].
    pub fn resolve_id(&self, collection: &str, segment: &str) -> EntityId {
        recover(self.collections.read())
            .get(collection)
            .and_then(|items| {
                items
                    .iter()
                    .filter_map(id_of)
                    .find(|id| id.to_string() == segment)
            })
            .unwrap_or_else(|| EntityId::from_path_segment(segment))
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        recover(self.calls.lock()).clone()
    }

    async fn enter(
        &self,
        op: RemoteOp,
        collection: &str,
        id: Option<&EntityId>,
        body: Option<&Fields>,
    ) -> Result<(), RemoteError> {
        recover(self.calls.lock()).push(RemoteCall {
            op,
            collection: collection.to_string(),
            id: id.cloned(),
            body: body.cloned(),
        });

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| RemoteError::Network("gate closed".into()))?
                .forget();
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = recover(self.failures.lock())
            .get_mut(&op)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn assign_id(&self) -> EntityId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        match &self.id_prefix {
            Some(prefix) => EntityId::Str(format!("{}{}", prefix, n)),
            None => EntityId::Int(n),
        }
    }
}

#[async_trait]
impl CollectionRemote for InMemoryRemote {
    async fn list(&self, collection: &str) -> Result<Vec<Value>, RemoteError> {
        self.enter(RemoteOp::List, collection, None, None).await?;
        Ok(self.list_now(collection))
    }

    async fn create(&self, collection: &str, draft: &Fields) -> Result<Value, RemoteError> {
        self.enter(RemoteOp::Create, collection, None, Some(draft)).await?;

        let id = self.assign_id();
        let mut fields = draft.clone();
        fields.insert("id".to_string(), to_json(&id)?);

        let mut collections = self
            .collections
            .write()
            .map_err(|_| poisoned("create"))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(fields.clone());

        Ok(Value::Object(fields))
    }

    async fn update(
        &self,
        collection: &str,
        id: &EntityId,
        body: &Fields,
    ) -> Result<Value, RemoteError> {
        self.enter(RemoteOp::Update, collection, Some(id), Some(body))
            .await?;

        let mut collections = self
            .collections
            .write()
            .map_err(|_| poisoned("update"))?;
        let stored = collections
            .get_mut(collection)
            .and_then(|items| items.iter_mut().find(|f| id_of(f).as_ref() == Some(id)))
            .ok_or_else(|| RemoteError::NotFound(format!("{}/{}", collection, id)))?;

        for (key, value) in body {
            if key != "id" {
                stored.insert(key.clone(), value.clone());
            }
        }

        Ok(Value::Object(stored.clone()))
    }

    async fn delete(&self, collection: &str, id: &EntityId) -> Result<(), RemoteError> {
        self.enter(RemoteOp::Delete, collection, Some(id), None).await?;

        let mut collections = self
            .collections
            .write()
            .map_err(|_| poisoned("delete"))?;
        let items = collections
            .get_mut(collection)
            .ok_or_else(|| RemoteError::NotFound(format!("{}/{}", collection, id)))?;
        let index = items
            .iter()
            .position(|f| id_of(f).as_ref() == Some(id))
            .ok_or_else(|| RemoteError::NotFound(format!("{}/{}", collection, id)))?;
        items.remove(index);

        Ok(())
    }
}

fn id_of(fields: &Fields) -> Option<EntityId> {
    fields
        .get("id")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn to_json(id: &EntityId) -> Result<Value, RemoteError> {
    serde_json::to_value(id).map_err(|e| RemoteError::Decode(e.to_string()))
}

fn poisoned(operation: &str) -> RemoteError {
    RemoteError::Rejected {
        status: 500,
        message: format!("in-memory remote lock poisoned during {}", operation),
    }
}

fn recover<G>(result: Result<G, std::sync::PoisonError<G>>) -> G {
    result.unwrap_or_else(|poisoned| poisoned.into_inner())
}
