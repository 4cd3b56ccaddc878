use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use spore_common::TxResult;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Input of a running quorum actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuorumEvent {
    Vote { member: String, result: TxResult },
}

/// Active quorums of this node, keyed by transaction id.
#[derive(Debug, Default)]
pub struct QuorumTable {
    active: Mutex<HashMap<Uuid, mpsc::UnboundedSender<QuorumEvent>>>,
}

impl QuorumTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::UnboundedSender<QuorumEvent>>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a quorum; false if one is already running for `id`.
    pub fn insert(&self, id: Uuid, inbox: mpsc::UnboundedSender<QuorumEvent>) -> bool {
        let mut active = self.active();
        if active.contains_key(&id) {
            return false;
        }
        active.insert(id, inbox);
        true
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.active().remove(id).is_some()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.active().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.active().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Routes a vote to the quorum owning `id`. Unmatched votes are dropped.
    pub fn deliver(&self, id: &Uuid, member: String, result: TxResult) -> bool {
        match self.active().get(id) {
            Some(inbox) => inbox.send(QuorumEvent::Vote { member, result }).is_ok(),
            None => false,
        }
    }
}
