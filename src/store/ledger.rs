//! Ledger - confirmed server state plus the ordered list of pending
//! optimistic mutations.
//!
//! The visible collection is never stored; it is rendered by replaying every
//! pending mutation, in issuance order, over the confirmed slots. Rolling a
//! mutation back is therefore just forgetting it.

use serde_json::Value;

use crate::entity::{merge_fields, Entity, EntityId, Fields};

/// A position in the confirmed sequence.
///
/// `Creating` reserves the place of an optimistic create so the server's
/// entity lands exactly where the placeholder was shown.
#[derive(Debug, Clone)]
enum Slot<T> {
    Confirmed(T),
    Creating(u64),
}

/// What a pending mutation does to the visible collection.
#[derive(Debug, Clone)]
pub(crate) enum PendingOp<T> {
    Create(T),
    Update { id: EntityId, patch: Fields },
    Delete { id: EntityId },
}

/// An in-flight change, identified by its issuance sequence number.
#[derive(Debug, Clone)]
pub(crate) struct PendingMutation<T> {
    pub seq: u64,
    pub op: PendingOp<T>,
}

#[derive(Debug)]
pub(crate) struct Ledger<T> {
    slots: Vec<Slot<T>>,
    pending: Vec<PendingMutation<T>>,
    next_seq: u64,
    next_local: u64,
}

impl<T> Default for Ledger<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            pending: Vec::new(),
            next_seq: 1,
            next_local: 1,
        }
    }
}

impl<T: Entity> Ledger<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Confirmed state with every pending mutation applied in issuance order.
    pub fn render(&self) -> Vec<T> {
        let mut visible: Vec<T> = self
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Confirmed(entity) => Some(entity.clone()),
                Slot::Creating(seq) => self.created_entity(*seq).cloned(),
            })
            .collect();

        for mutation in &self.pending {
            match &mutation.op {
                PendingOp::Create(_) => {}
                PendingOp::Update { id, patch } => {
                    if let Some(entity) = visible.iter_mut().find(|e| e.id() == id) {
                        match merge_fields(entity, patch) {
                            Ok(merged) => *entity = merged,
                            Err(e) => {
                                tracing::warn!(%id, "skipping unmergeable pending patch: {}", e)
                            }
                        }
                    }
                }
                PendingOp::Delete { id } => visible.retain(|e| e.id() != id),
            }
        }

        visible
    }

    /// The entity as currently visible, pending mutations included.
    pub fn visible(&self, id: &EntityId) -> Option<T> {
        self.render().into_iter().find(|e| e.id() == id)
    }

    /// The entity as last confirmed by the server.
    pub fn confirmed(&self, id: &EntityId) -> Option<&T> {
        self.slots.iter().find_map(|slot| match slot {
            Slot::Confirmed(entity) if entity.id() == id => Some(entity),
            _ => None,
        })
    }

    /// Replace confirmed state with a fresh server listing.
    ///
    /// Placeholders of still-pending creates stay, after the listing.
    /// Duplicate ids in the listing keep their first occurrence.
    pub fn replace_confirmed(&mut self, entities: Vec<T>) {
        let creating: Vec<Slot<T>> = self
            .slots
            .drain(..)
            .filter(|slot| matches!(slot, Slot::Creating(_)))
            .collect();

        for entity in entities {
            if self.confirmed(entity.id()).is_some() {
                tracing::warn!(id = %entity.id(), "dropping duplicate id from listing");
                continue;
            }
            self.slots.push(Slot::Confirmed(entity));
        }
        self.slots.extend(creating);
    }

    /// Append an optimistic entity built from `draft` under a fresh local id.
    pub fn begin_create(&mut self, draft: &Fields) -> Result<(u64, T), serde_json::Error> {
        let local = EntityId::Local(self.next_local);
        let mut fields = draft.clone();
        fields.insert("id".to_string(), serde_json::to_value(&local)?);
        let entity: T = serde_json::from_value(Value::Object(fields))?;
        self.next_local += 1;

        let seq = self.issue(PendingOp::Create(entity.clone()));
        self.slots.push(Slot::Creating(seq));
        Ok((seq, entity))
    }

    pub fn begin_update(&mut self, id: EntityId, patch: Fields) -> u64 {
        self.issue(PendingOp::Update { id, patch })
    }

    pub fn begin_delete(&mut self, id: EntityId) -> u64 {
        self.issue(PendingOp::Delete { id })
    }

    /// Swap the placeholder of create `seq` for the server's entity, in place.
    ///
    /// If the server id is already confirmed (a reload got there first) the
    /// placeholder is dropped instead, keeping ids unique.
    pub fn confirm_create(&mut self, seq: u64, entity: T) {
        self.take_pending(seq);
        let index = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Slot::Creating(s) if *s == seq));

        if self.confirmed(entity.id()).is_some() {
            if let Some(index) = index {
                self.slots.remove(index);
            }
            return;
        }

        match index {
            Some(index) => self.slots[index] = Slot::Confirmed(entity),
            None => self.slots.push(Slot::Confirmed(entity)),
        }
    }

    /// Fold update `seq` into confirmed state, then overlay the server's
    /// response fields. Returns the new confirmed entity, or `None` when the
    /// entity is no longer confirmed locally.
    pub fn confirm_update(
        &mut self,
        seq: u64,
        response: Option<&Fields>,
    ) -> Result<Option<T>, serde_json::Error> {
        let Some(PendingMutation {
            op: PendingOp::Update { id, patch },
            ..
        }) = self.take_pending(seq)
        else {
            return Ok(None);
        };

        let Some(entity) = self.slots.iter_mut().find_map(|slot| match slot {
            Slot::Confirmed(entity) if entity.id() == &id => Some(entity),
            _ => None,
        }) else {
            return Ok(None);
        };

        let mut merged = merge_fields(entity, &patch)?;
        if let Some(response) = response {
            merged = merge_fields(&merged, response)?;
        }
        *entity = merged.clone();
        Ok(Some(merged))
    }

    /// Remove the deleted entity from confirmed state.
    pub fn confirm_delete(&mut self, seq: u64) {
        if let Some(PendingMutation {
            op: PendingOp::Delete { id },
            ..
        }) = self.take_pending(seq)
        {
            self.slots
                .retain(|slot| !matches!(slot, Slot::Confirmed(entity) if entity.id() == &id));
        }
    }

    /// Roll back mutation `seq`: forget it, along with any create placeholder.
    pub fn discard(&mut self, seq: u64) {
        self.take_pending(seq);
        self.slots
            .retain(|slot| !matches!(slot, Slot::Creating(s) if *s == seq));
    }

    fn issue(&mut self, op: PendingOp<T>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(PendingMutation { seq, op });
        seq
    }

    fn take_pending(&mut self, seq: u64) -> Option<PendingMutation<T>> {
        let index = self.pending.iter().position(|m| m.seq == seq)?;
        Some(self.pending.remove(index))
    }

    fn created_entity(&self, seq: u64) -> Option<&T> {
        self.pending.iter().find_map(|m| match &m.op {
            PendingOp::Create(entity) if m.seq == seq => Some(entity),
            _ => None,
        })
    }
}
