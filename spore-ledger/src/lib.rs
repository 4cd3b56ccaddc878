//! Per-node UTXO ledger.
//!
//! [`Ledger`] serializes every operation behind a single mutex so that a
//! validate, lock, unlock or commit never interleaves with another.

pub mod snapshot;
pub mod state;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use spore_common::{Amount, KeyHash, PublicKey, Result, Transaction, TxKind, TxResult};
use tracing::{debug, info};

use crate::snapshot::Snapshot;
use crate::state::LedgerState;
pub use crate::state::Utxo;

#[derive(Debug)]
pub struct Ledger {
    state: Mutex<LedgerState>,
    lock_timeout: Duration,
}

impl Ledger {
    /// `lock_timeout` is the age after which another transaction's lock is reclaimed.
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(LedgerState::new()),
            lock_timeout,
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn validate(&self, tx: &Transaction) -> TxResult {
        self.state().validate(tx)
    }

    pub fn lock(&self, tx: &Transaction) -> TxResult {
        self.lock_at(tx, Instant::now())
    }

    pub fn lock_at(&self, tx: &Transaction, now: Instant) -> TxResult {
        self.state().lock(tx, now, self.lock_timeout)
    }

    /// Validate and, if that succeeds, lock, as one atomic step.
    pub fn validate_and_lock(&self, tx: &Transaction) -> TxResult {
        let mut state = self.state();
        match state.validate(tx) {
            TxResult::Success => state.lock(tx, Instant::now(), self.lock_timeout),
            other => other,
        }
    }

    pub fn unlock(&self, tx: &Transaction) {
        self.state().unlock(tx)
    }

    pub fn commit(&self, tx: &Transaction) -> TxResult {
        let result = self.state().commit(tx);
        match result {
            TxResult::Success => info!(tx = %tx.id, kind = ?tx.kind, "✅ committed"),
            other => debug!(tx = %tx.id, result = %other, "commit skipped"),
        }
        result
    }

    pub fn balance(&self, public_key: &PublicKey) -> Amount {
        self.state().balance(public_key)
    }

    /// Fills each output of a balance query with the owner's current balance.
    pub fn answer_balance_query(&self, tx: &Transaction) -> Transaction {
        let state = self.state();
        let mut answered = tx.clone();
        if tx.kind == TxKind::BalanceQuery {
            for output in &mut answered.outputs {
                output.amount = state.balance(&output.public_key);
            }
        }
        answered
    }

    pub fn utxo(&self, hash: KeyHash) -> Option<Utxo> {
        self.state().utxos.get(&hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn history(&self) -> Vec<Transaction> {
        self.state().history.clone()
    }

    pub fn clear(&self) {
        *self.state() = LedgerState::new();
        info!("ledger cleared");
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state())
    }

    /// Replaces the UTXO set with the snapshot at `path`.
    ///
    /// Returns `Ok(false)` when the file does not exist.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            info!("ledger file {} does not exist, starting empty", path.display());
            return Ok(false);
        }
        let snapshot = Snapshot::load_from_file(path)?;
        let count = snapshot.utxos.len();
        *self.state() = snapshot.restore();
        info!("loaded {} utxos from {}", count, path.display());
        Ok(true)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot = self.snapshot();
        snapshot.save_to_file(&path)?;
        info!("saved {} utxos to {}", snapshot.utxos.len(), path.as_ref().display());
        Ok(())
    }
}
