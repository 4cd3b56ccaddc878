use std::time::{Duration, Instant};

use spore_common::{Output, Transaction};
use uuid::Uuid;

/// Unspent output plus its advisory lock.
#[derive(Debug, Clone, PartialEq)]
pub struct Utxo {
    pub output: Output,
    pub lock_holder: Option<Uuid>,
    pub lock_time: Option<Instant>,
}

impl Utxo {
    pub fn new(output: Output) -> Self {
        Self {
            output,
            lock_holder: None,
            lock_time: None,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock_holder.is_some()
    }

    /// Whether `tx` may take the lock at `now`: free, already ours, or held past `timeout`.
    pub fn lockable_by(&self, tx: &Transaction, now: Instant, timeout: Duration) -> bool {
        match (self.lock_holder, self.lock_time) {
            (None, _) => true,
            (Some(holder), _) if holder == tx.id => true,
            (Some(_), Some(since)) => now.saturating_duration_since(since) >= timeout,
            (Some(_), None) => true,
        }
    }

    pub fn set_lock(&mut self, holder: Uuid, now: Instant) {
        self.lock_holder = Some(holder);
        self.lock_time = Some(now);
    }

    pub fn clear_lock(&mut self) {
        self.lock_holder = None;
        self.lock_time = None;
    }
}
