use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use spore_common::crypto::hash_public_key;
use spore_common::{Amount, KeyHash, Output, PublicKey, Result};
use tracing::warn;

use crate::state::{LedgerState, Utxo};

/// One persisted UTXO: `(owner key hash, owner public key, amount)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub hash: KeyHash,
    pub public_key: PublicKey,
    pub amount: Amount,
}

/// On-disk ledger format. Locks and history are not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub utxos: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn capture(state: &LedgerState) -> Self {
        let mut utxos: Vec<SnapshotEntry> = state
            .utxos
            .iter()
            .map(|(hash, utxo)| SnapshotEntry {
                hash: *hash,
                public_key: utxo.output.public_key,
                amount: utxo.output.amount,
            })
            .collect();
        utxos.sort_by_key(|e| e.hash);
        Self { utxos }
    }

    /// Rebuilds a state from the snapshot. Output ids are freshly generated.
    ///
    /// UTXOs are keyed by the hash of their public key; a stored hash that
    /// disagrees is ignored.
    pub fn restore(self) -> LedgerState {
        let mut state = LedgerState::new();
        for entry in self.utxos {
            let hash = hash_public_key(&entry.public_key);
            if hash != entry.hash {
                warn!(stored = entry.hash, actual = hash, "snapshot entry hash mismatch, rekeyed");
            }
            let output = Output::new(entry.public_key, entry.amount);
            state.utxos.insert(hash, Utxo::new(output));
        }
        state
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let snapshot = serde_json::from_str(&data)?;
        Ok(snapshot)
    }
}
