//! Per-id ordering of remote writes.
//!
//! Every update or delete takes a `Ticket` for its target id at issuance
//! time. A ticket waits for the previous ticket on the same id to be dropped
//! before its remote call goes out, so calls for one id reach the server in
//! the order they were made. Different ids never wait on each other.

use std::collections::HashMap;

use tokio::sync::oneshot;

use crate::entity::EntityId;

/// Tail of the chain for each id with writes in flight.
#[derive(Debug, Default)]
pub(crate) struct IdQueue {
    tails: HashMap<EntityId, (u64, oneshot::Receiver<()>)>,
}

/// Permission to issue mutation `seq`'s remote call once its turn comes.
///
/// Dropping the ticket hands the turn to the next mutation on the same id.
#[derive(Debug)]
pub(crate) struct Ticket {
    previous: Option<oneshot::Receiver<()>>,
    _turn: oneshot::Sender<()>,
}

impl IdQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the queue for `id` as mutation `seq`.
    pub fn enqueue(&mut self, id: &EntityId, seq: u64) -> Ticket {
        let (turn, done) = oneshot::channel();
        let previous = self
            .tails
            .insert(id.clone(), (seq, done))
            .map(|(_, receiver)| receiver);
        Ticket {
            previous,
            _turn: turn,
        }
    }

    /// Forget `id` if `seq` is still the last mutation queued on it.
    pub fn finish(&mut self, id: &EntityId, seq: u64) {
        if self.tails.get(id).is_some_and(|(tail, _)| *tail == seq) {
            self.tails.remove(id);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tails.len()
    }
}

impl Ticket {
    /// Wait until every earlier mutation on the same id has settled.
    pub async fn wait_turn(&mut self) {
        if let Some(previous) = self.previous.take() {
            // Err means the previous ticket was dropped: our turn either way.
            let _ = previous.await;
        }
    }
}
