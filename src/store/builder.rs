use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use super::ledger::Ledger;
use super::queue::IdQueue;
use super::{CollectionStore, Phase, Shared, Snapshot, State};
use crate::config::{ClientConfig, DEFAULT_MUTATION_TIMEOUT};
use crate::entity::Entity;
use crate::notify::{LogNotifier, Notifier};
use crate::remote::CollectionRemote;
use crate::validate::{AcceptAll, Validator};

/// Configures a [`CollectionStore`] before it is created.
pub struct StoreBuilder<T> {
    collection: String,
    remote: Arc<dyn CollectionRemote>,
    notifier: Arc<dyn Notifier>,
    validator: Arc<dyn Validator>,
    mutation_timeout: Option<Duration>,
    notify_success: bool,
    _entity: std::marker::PhantomData<fn() -> T>,
}

impl<T: Entity> StoreBuilder<T> {
    pub(super) fn new(remote: Arc<dyn CollectionRemote>, collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            remote,
            notifier: Arc::new(LogNotifier),
            validator: Arc::new(AcceptAll),
            mutation_timeout: Some(DEFAULT_MUTATION_TIMEOUT),
            notify_success: false,
            _entity: std::marker::PhantomData,
        }
    }

    /// Where mutation failures are reported. Defaults to [`LogNotifier`].
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Local checks run before any optimistic change. Defaults to [`AcceptAll`].
    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Roll a mutation back if the remote has not answered within `timeout`.
    /// `None` waits as long as the transport does.
    pub fn mutation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.mutation_timeout = timeout;
        self
    }

    /// Also notify on confirmed mutations, not only on rollbacks.
    pub fn notify_success(mut self, enabled: bool) -> Self {
        self.notify_success = enabled;
        self
    }

    /// Take the mutation timeout from client configuration.
    pub fn config(self, config: &ClientConfig) -> Self {
        self.mutation_timeout(config.mutation_timeout)
    }

    pub fn build(self) -> CollectionStore<T> {
        let (snapshots, _) = watch::channel(Snapshot::empty());
        CollectionStore {
            shared: Arc::new(Shared {
                collection: self.collection,
                remote: self.remote,
                notifier: self.notifier,
                validator: self.validator,
                mutation_timeout: self.mutation_timeout,
                notify_success: self.notify_success,
                disposed: AtomicBool::new(false),
                state: Mutex::new(State {
                    ledger: Ledger::new(),
                    queue: IdQueue::new(),
                    phase: Phase::Idle,
                    load_epoch: 0,
                }),
                snapshots,
            }),
        }
    }
}
