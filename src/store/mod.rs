//! CollectionStore - optimistic client-side cache of one remote collection.
//!
//! Mutations change the local collection immediately, then go to the remote.
//! Success folds the server's answer into confirmed state; failure forgets
//! the mutation (rolling the view back), reports a notification and returns
//! the error.
//!
//! ```text
//!                  load()                  ok
//!   Idle ──────────────────▶ Loading ──────────────▶ Ready ⇄ Mutating
//!                               │  err                 ▲
//!                               ▼                      │
//!                             Error ───── retry() ─────┘ (via Loading)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use optimistic_store::{CollectionStore, InMemoryRemote, Record};
//! use serde_json::json;
//!
//! let store = CollectionStore::<Record>::new(Arc::new(InMemoryRemote::new()), "guests");
//! store.load().await?;
//! let guest = store.create(json!({ "name": "Ada" })).await?;
//! store.update(guest.id.clone(), json!({ "name": "Ada L." })).await?;
//! store.delete(guest.id).await?;
//! ```

mod builder;
mod ledger;
mod queue;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::entity::{merge_fields, to_fields, Entity, EntityId, Fields, Resource};
use crate::error::{RemoteError, StoreError};
use crate::notify::{Notification, Notifier};
use crate::remote::CollectionRemote;
use crate::validate::Validator;

pub use builder::StoreBuilder;

use ledger::Ledger;
use queue::{IdQueue, Ticket};

/// Lifecycle status of a store, as shown to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreStatus {
    /// Nothing loaded yet.
    Idle,
    /// A load is in flight.
    Loading,
    /// Loaded, no mutation in flight.
    Ready,
    /// Loaded, at least one mutation in flight. Reads are not blocked.
    Mutating,
    /// The last load failed; `retry()` starts a new one.
    Error { message: String },
}

/// What the UI renders: the visible collection plus status.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub entities: Vec<T>,
    pub status: StoreStatus,
    pub pending: usize,
}

impl<T> Snapshot<T> {
    fn empty() -> Self {
        Self {
            entities: Vec::new(),
            status: StoreStatus::Idle,
            pending: 0,
        }
    }
}

/// Load phase, before mutations are taken into account.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

struct State<T> {
    ledger: Ledger<T>,
    queue: IdQueue,
    phase: Phase,
    load_epoch: u64,
}

pub(crate) struct Shared<T> {
    collection: String,
    remote: Arc<dyn CollectionRemote>,
    notifier: Arc<dyn Notifier>,
    validator: Arc<dyn Validator>,
    mutation_timeout: Option<Duration>,
    notify_success: bool,
    disposed: AtomicBool,
    state: Mutex<State<T>>,
    snapshots: watch::Sender<Snapshot<T>>,
}

/// Optimistic cache of one remote collection.
///
/// Cheap to clone; clones share state. Must be used inside a tokio runtime:
/// every remote round-trip runs on a spawned task so a dropped caller never
/// aborts a request that is already on the wire.
pub struct CollectionStore<T: Entity> {
    shared: Arc<Shared<T>>,
}

impl<T: Entity> Clone for CollectionStore<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Entity> CollectionStore<T> {
    /// Create a store for `collection` with default settings.
    pub fn new(remote: Arc<dyn CollectionRemote>, collection: impl Into<String>) -> Self {
        Self::builder(remote, collection).build()
    }

    /// Start configuring a store for `collection`.
    pub fn builder(
        remote: Arc<dyn CollectionRemote>,
        collection: impl Into<String>,
    ) -> StoreBuilder<T> {
        StoreBuilder::new(remote, collection)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Name of the remote collection.
    pub fn collection(&self) -> &str {
        &self.shared.collection
    }

    /// The latest visible collection and status.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.shared.snapshots.borrow().clone()
    }

    /// The latest visible collection.
    pub fn entities(&self) -> Vec<T> {
        self.shared.snapshots.borrow().entities.clone()
    }

    /// The visible entity with `id`, if any.
    pub fn get(&self, id: &EntityId) -> Option<T> {
        self.shared
            .snapshots
            .borrow()
            .entities
            .iter()
            .find(|e| e.id() == id)
            .cloned()
    }

    pub fn status(&self) -> StoreStatus {
        self.shared.snapshots.borrow().status.clone()
    }

    pub fn len(&self) -> usize {
        self.shared.snapshots.borrow().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of mutations issued but not yet settled.
    pub fn pending_count(&self) -> usize {
        self.shared.snapshots.borrow().pending
    }

    /// Receive a new snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.shared.snapshots.subscribe()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Fetch the whole collection, replacing confirmed state.
    ///
    /// On failure the status becomes `Error` and the collection is left as it
    /// was. When loads overlap, only the most recently started one applies.
    ///
    /// Creates still awaiting their response keep their placeholders. If the
    /// fresh listing already holds such an entity, it shows twice (under its
    /// server id and under the local id) until the create settles and the
    /// placeholder is dropped.
    pub async fn load(&self) -> Result<Snapshot<T>, StoreError> {
        self.ensure_live()?;
        let epoch = {
            let mut state = self.shared.lock_state("load")?;
            state.load_epoch += 1;
            state.phase = Phase::Loading;
            self.shared.publish(&state);
            state.load_epoch
        };
        info!(collection = %self.shared.collection, "loading collection");

        let shared = Arc::clone(&self.shared);
        detach(async move {
            let outcome = shared.remote.list(&shared.collection).await;
            shared.settle_load(epoch, outcome)
        })
        .await
    }

    /// Reload after a failed load. Any other status returns the current
    /// snapshot unchanged.
    pub async fn retry(&self) -> Result<Snapshot<T>, StoreError> {
        match self.status() {
            StoreStatus::Error { .. } => self.load().await,
            _ => Ok(self.snapshot()),
        }
    }

    /// Detach the store from its view.
    ///
    /// In-flight requests still complete, but their outcomes no longer touch
    /// state or raise notifications. Further operations fail with `Disposed`.
    pub fn dispose(&self) {
        if !self.shared.disposed.swap(true, Ordering::SeqCst) {
            debug!(collection = %self.shared.collection, "store disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create an entity from `payload` (a JSON object; any `id` is ignored).
    ///
    /// The entity appears at the end of the collection at once under a local
    /// id, and is replaced in place by the server's entity on success.
    pub async fn create<P: Serialize + ?Sized>(&self, payload: &P) -> Result<T, StoreError> {
        self.ensure_live()?;
        let mut draft = self.shared.payload("create", payload)?;
        draft.remove("id");
        if let Err(message) = self.shared.validator.validate_draft(&draft) {
            return Err(self.shared.reject("create", message));
        }

        let seq = {
            let mut state = self.shared.lock_state("create")?;
            let (seq, placeholder) = match state.ledger.begin_create(&draft) {
                Ok(created) => created,
                Err(e) => {
                    drop(state);
                    return Err(self.shared.reject("create", e.to_string()));
                }
            };
            self.shared.publish(&state);
            debug!(collection = %self.shared.collection, id = %placeholder.id(), seq, "optimistic create");
            seq
        };

        let shared = Arc::clone(&self.shared);
        detach(async move {
            let outcome = shared
                .bounded(shared.remote.create(&shared.collection, &draft))
                .await;
            shared.settle_create(seq, outcome)
        })
        .await
    }

    /// Shallow-merge `patch` into the entity at `id`.
    ///
    /// `id` must be visible and confirmed by the server. The merge shows at
    /// once; the remote receives the confirmed entity with the patch applied.
    pub async fn update<P: Serialize + ?Sized>(
        &self,
        id: impl Into<EntityId>,
        patch: &P,
    ) -> Result<T, StoreError> {
        self.ensure_live()?;
        let id = id.into();
        let mut patch = self.shared.payload("update", patch)?;
        patch.remove("id");
        if id.is_local() {
            return Err(StoreError::Unconfirmed(id));
        }
        if let Err(message) = self.shared.validator.validate_patch(&patch) {
            return Err(self.shared.reject("update", message));
        }

        let (seq, ticket) = {
            let mut state = self.shared.lock_state("update")?;
            let current = state
                .ledger
                .visible(&id)
                .ok_or_else(|| StoreError::UnknownId(id.clone()))?;
            if let Err(e) = merge_fields(&current, &patch) {
                drop(state);
                return Err(self.shared.reject("update", e.to_string()));
            }

            let seq = state.ledger.begin_update(id.clone(), patch.clone());
            let ticket = state.queue.enqueue(&id, seq);
            self.shared.publish(&state);
            debug!(collection = %self.shared.collection, %id, seq, "optimistic update");
            (seq, ticket)
        };

        let shared = Arc::clone(&self.shared);
        detach(async move { shared.run_update(seq, id, patch, ticket).await }).await
    }

    /// Remove the entity at `id`.
    ///
    /// It disappears at once; if the remote refuses, it comes back at its
    /// original index.
    pub async fn delete(&self, id: impl Into<EntityId>) -> Result<(), StoreError> {
        self.ensure_live()?;
        let id = id.into();
        if id.is_local() {
            return Err(StoreError::Unconfirmed(id));
        }

        let (seq, ticket) = {
            let mut state = self.shared.lock_state("delete")?;
            if state.ledger.visible(&id).is_none() {
                return Err(StoreError::UnknownId(id));
            }
            let seq = state.ledger.begin_delete(id.clone());
            let ticket = state.queue.enqueue(&id, seq);
            self.shared.publish(&state);
            debug!(collection = %self.shared.collection, %id, seq, "optimistic delete");
            (seq, ticket)
        };

        let shared = Arc::clone(&self.shared);
        detach(async move { shared.run_delete(seq, id, ticket).await }).await
    }

    fn ensure_live(&self) -> Result<(), StoreError> {
        if self.is_disposed() {
            Err(StoreError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl<T: Resource> CollectionStore<T> {
    /// Create a store for the resource's own collection.
    pub fn for_resource(remote: Arc<dyn CollectionRemote>) -> Self {
        Self::new(remote, T::COLLECTION)
    }
}

impl<T: Entity> Shared<T> {
    fn lock_state(&self, operation: &'static str) -> Result<MutexGuard<'_, State<T>>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::LockPoisoned(operation))
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Re-render and broadcast. Called with the state lock held.
    fn publish(&self, state: &State<T>) {
        let pending = state.ledger.pending_len();
        let status = match &state.phase {
            Phase::Idle => StoreStatus::Idle,
            Phase::Loading => StoreStatus::Loading,
            Phase::Ready if pending > 0 => StoreStatus::Mutating,
            Phase::Ready => StoreStatus::Ready,
            Phase::Failed(message) => StoreStatus::Error {
                message: message.clone(),
            },
        };
        self.snapshots.send_replace(Snapshot {
            entities: state.ledger.render(),
            status,
            pending,
        });
    }

    fn payload<P: Serialize + ?Sized>(
        &self,
        action: &str,
        payload: &P,
    ) -> Result<Fields, StoreError> {
        to_fields(payload).map_err(|e| self.reject(action, e.to_string()))
    }

    /// Report a payload rejected before any change was made.
    fn reject(&self, action: &str, message: String) -> StoreError {
        warn!(collection = %self.collection, action, "rejected payload: {}", message);
        self.notifier.notify(Notification::error(
            format!("Invalid {} payload", self.collection),
            message.clone(),
        ));
        StoreError::Validation(message)
    }

    /// Report a rolled-back mutation.
    fn report_failure(&self, action: &str, error: &StoreError) {
        warn!(collection = %self.collection, action, "mutation rolled back: {}", error);
        self.notifier.notify(Notification::error(
            format!("Could not {} {}", action, self.collection),
            error.to_string(),
        ));
    }

    fn report_success(&self, action: &str, id: &EntityId) {
        if self.notify_success {
            self.notifier.notify(Notification::success(
                format!("{} {}", past_tense(action), self.collection),
                format!("{} {} {}", self.collection, id, past_tense(action).to_lowercase()),
            ));
        }
    }

    async fn bounded<F, V>(&self, call: F) -> Result<V, RemoteError>
    where
        F: Future<Output = Result<V, RemoteError>>,
    {
        match self.mutation_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(RemoteError::Timeout)),
            None => call.await,
        }
    }

    fn settle_load(
        &self,
        epoch: u64,
        outcome: Result<Vec<Value>, RemoteError>,
    ) -> Result<Snapshot<T>, StoreError> {
        let decoded = outcome.map_err(StoreError::from).and_then(|items| {
            items
                .into_iter()
                .map(|item| serde_json::from_value::<T>(item).map_err(StoreError::from))
                .collect::<Result<Vec<T>, StoreError>>()
        });

        if self.is_disposed() {
            debug!(collection = %self.collection, "load finished after dispose, ignoring");
            return decoded.map(|_| self.snapshots.borrow().clone());
        }

        let mut state = self.lock_state("load")?;
        if state.load_epoch != epoch {
            debug!(collection = %self.collection, epoch, "load superseded, ignoring");
            return decoded.map(|_| self.snapshots.borrow().clone());
        }

        match decoded {
            Ok(entities) => {
                info!(collection = %self.collection, count = entities.len(), "collection loaded");
                state.ledger.replace_confirmed(entities);
                state.phase = Phase::Ready;
                self.publish(&state);
                Ok(self.snapshots.borrow().clone())
            }
            Err(e) => {
                warn!(collection = %self.collection, "load failed: {}", e);
                state.phase = Phase::Failed(e.to_string());
                self.publish(&state);
                Err(e)
            }
        }
    }

    fn settle_create(&self, seq: u64, outcome: Result<Value, RemoteError>) -> Result<T, StoreError> {
        let decoded = outcome
            .map_err(StoreError::from)
            .and_then(|value| serde_json::from_value::<T>(value).map_err(StoreError::from))
            .and_then(|entity| {
                if entity.id().is_local() {
                    Err(StoreError::Remote(RemoteError::Decode(
                        "server returned a client-local id".into(),
                    )))
                } else {
                    Ok(entity)
                }
            });

        if self.is_disposed() {
            debug!(collection = %self.collection, seq, "create settled after dispose, ignoring");
            return decoded;
        }

        let mut state = self.lock_state("create")?;
        match decoded {
            Ok(entity) => {
                state.ledger.confirm_create(seq, entity.clone());
                self.publish(&state);
                drop(state);
                debug!(collection = %self.collection, id = %entity.id(), seq, "create confirmed");
                self.report_success("create", entity.id());
                Ok(entity)
            }
            Err(e) => {
                state.ledger.discard(seq);
                self.publish(&state);
                drop(state);
                self.report_failure("create", &e);
                Err(e)
            }
        }
    }

    async fn run_update(
        &self,
        seq: u64,
        id: EntityId,
        patch: Fields,
        mut ticket: Ticket,
    ) -> Result<T, StoreError> {
        ticket.wait_turn().await;

        let outcome = match self.update_body(&id, &patch) {
            Ok(body) => self
                .bounded(self.remote.update(&self.collection, &id, &body))
                .await
                .map_err(StoreError::from),
            Err(e) => Err(e),
        };
        let result = self.settle_update(seq, &id, outcome);
        drop(ticket);
        result
    }

    /// Confirmed entity with `patch` applied, computed once earlier writes on
    /// the same id have settled.
    ///
    /// Patch keys are inserted as sent, so an explicit `null` reaches the
    /// server even when the entity type skips absent fields on serialize.
    fn update_body(&self, id: &EntityId, patch: &Fields) -> Result<Fields, StoreError> {
        let state = self.lock_state("update")?;
        let confirmed = state
            .ledger
            .confirmed(id)
            .ok_or_else(|| StoreError::UnknownId(id.clone()))?;
        let mut body = to_fields(confirmed)?;
        for (key, value) in patch {
            if key != "id" {
                body.insert(key.clone(), value.clone());
            }
        }
        Ok(body)
    }

    fn settle_update(
        &self,
        seq: u64,
        id: &EntityId,
        outcome: Result<Value, StoreError>,
    ) -> Result<T, StoreError> {
        if self.is_disposed() {
            debug!(collection = %self.collection, %id, seq, "update settled after dispose, ignoring");
            return outcome
                .and_then(|value| serde_json::from_value::<T>(value).map_err(StoreError::from));
        }

        let mut state = self.lock_state("update")?;
        state.queue.finish(id, seq);

        let confirmed = match outcome {
            Ok(response) => {
                let response = match response {
                    Value::Object(fields) => Some(fields),
                    _ => None,
                };
                match state.ledger.confirm_update(seq, response.as_ref()) {
                    Ok(Some(entity)) => Ok(entity),
                    Ok(None) => Err(StoreError::UnknownId(id.clone())),
                    Err(e) => Err(StoreError::from(e)),
                }
            }
            Err(e) => {
                state.ledger.discard(seq);
                Err(e)
            }
        };
        self.publish(&state);
        drop(state);

        match confirmed {
            Ok(entity) => {
                debug!(collection = %self.collection, %id, seq, "update confirmed");
                self.report_success("update", id);
                Ok(entity)
            }
            Err(StoreError::UnknownId(id)) => {
                warn!(collection = %self.collection, %id, "updated entity is no longer loaded");
                Err(StoreError::UnknownId(id))
            }
            Err(e) => {
                self.report_failure("update", &e);
                Err(e)
            }
        }
    }

    async fn run_delete(&self, seq: u64, id: EntityId, mut ticket: Ticket) -> Result<(), StoreError> {
        ticket.wait_turn().await;

        let outcome = self
            .bounded(self.remote.delete(&self.collection, &id))
            .await
            .map_err(StoreError::from);
        let result = self.settle_delete(seq, &id, outcome);
        drop(ticket);
        result
    }

    fn settle_delete(
        &self,
        seq: u64,
        id: &EntityId,
        outcome: Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        if self.is_disposed() {
            debug!(collection = %self.collection, %id, seq, "delete settled after dispose, ignoring");
            return outcome;
        }

        let mut state = self.lock_state("delete")?;
        state.queue.finish(id, seq);
        match &outcome {
            Ok(()) => state.ledger.confirm_delete(seq),
            Err(_) => state.ledger.discard(seq),
        }
        self.publish(&state);
        drop(state);

        match outcome {
            Ok(()) => {
                debug!(collection = %self.collection, %id, seq, "delete confirmed");
                self.report_success("delete", id);
                Ok(())
            }
            Err(e) => {
                self.report_failure("delete", &e);
                Err(e)
            }
        }
    }
}

/// Run `work` on its own task and wait for it. The task keeps running if the
/// caller stops waiting.
async fn detach<F, V>(work: F) -> Result<V, StoreError>
where
    F: Future<Output = Result<V, StoreError>> + Send + 'static,
    V: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}

fn past_tense(action: &str) -> &'static str {
    match action {
        "create" => "Created",
        "update" => "Updated",
        "delete" => "Deleted",
        _ => "Saved",
    }
}
