pub mod utxo;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use spore_common::crypto::{key_hash_bytes, verify_signature};
use spore_common::{Amount, KeyHash, PublicKey, Transaction, TxKind, TxResult};
use tracing::debug;

pub use self::utxo::Utxo;

/// UTXO map and applied-transaction history.
///
/// Every method leaves the state untouched when it reports a failure.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub utxos: HashMap<KeyHash, Utxo>,
    pub history: Vec<Transaction>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when some output of `tx` is already the current output of its owner.
    fn is_duplicate(&self, tx: &Transaction) -> bool {
        tx.outputs.iter().any(|output| {
            self.utxos
                .get(&output.key_hash())
                .is_some_and(|utxo| utxo.output.id == output.id)
        })
    }

    /// True when every owner's UTXO can absorb the outputs of `tx` without overflow.
    ///
    /// A payment's own inputs are spent before its outputs land, so they count as zero.
    fn outputs_fit(&self, tx: &Transaction) -> bool {
        let mut totals: HashMap<KeyHash, Amount> = HashMap::new();
        for output in &tx.outputs {
            let hash = output.key_hash();
            let current = match totals.get(&hash) {
                Some(total) => *total,
                None if tx.kind == TxKind::Payment && tx.inputs.iter().any(|i| i.key_hash == hash) => Amount::ZERO,
                None => self.utxos.get(&hash).map_or(Amount::ZERO, |utxo| utxo.output.amount),
            };
            match current.checked_add(output.amount) {
                Some(total) => totals.insert(hash, total),
                None => return false,
            };
        }
        true
    }

    pub fn validate(&self, tx: &Transaction) -> TxResult {
        if let Err(e) = tx.check_format() {
            debug!(tx = %tx.id, "malformed transaction: {}", e);
            return TxResult::Invalid;
        }

        if self.is_duplicate(tx) {
            return TxResult::Duplicate;
        }

        if !self.outputs_fit(tx) {
            debug!(tx = %tx.id, "output would overflow its owner's balance");
            return TxResult::Invalid;
        }

        if tx.kind != TxKind::Payment {
            return TxResult::Success;
        }

        let mut result = TxResult::Success;
        let mut coins_in = Amount::ZERO;
        for input in &tx.inputs {
            let Some(utxo) = self.utxos.get(&input.key_hash) else {
                // Missing may mean spent, or not replicated here yet.
                result = TxResult::Fail;
                continue;
            };

            if !verify_signature(
                &utxo.output.public_key,
                &key_hash_bytes(input.key_hash),
                &input.signature,
            ) {
                debug!(tx = %tx.id, hash = input.key_hash, "bad input signature");
                return TxResult::Invalid;
            }

            if tx.outputs.iter().any(|o| o.id == utxo.output.id) {
                return TxResult::Invalid;
            }

            coins_in = match coins_in.checked_add(utxo.output.amount) {
                Some(sum) => sum,
                None => return TxResult::Invalid,
            };
        }

        if result != TxResult::Success {
            return result;
        }

        match tx.coins_out() {
            Some(coins_out) if coins_out == coins_in => TxResult::Success,
            _ => {
                debug!(tx = %tx.id, %coins_in, "inputs and outputs do not balance");
                TxResult::Invalid
            }
        }
    }

    /// All-or-nothing: no UTXO is locked unless every input can be.
    pub fn lock(&mut self, tx: &Transaction, now: Instant, timeout: Duration) -> TxResult {
        if tx.kind != TxKind::Payment {
            return TxResult::Success;
        }

        for input in &tx.inputs {
            match self.utxos.get(&input.key_hash) {
                None => return TxResult::Invalid,
                Some(utxo) if !utxo.lockable_by(tx, now, timeout) => return TxResult::LockFail,
                Some(_) => {}
            }
        }

        for input in &tx.inputs {
            if let Some(utxo) = self.utxos.get_mut(&input.key_hash) {
                if utxo.lock_holder.is_some_and(|holder| holder != tx.id) {
                    debug!(tx = %tx.id, hash = input.key_hash, "reclaiming stale lock");
                }
                utxo.set_lock(tx.id, now);
            }
        }
        TxResult::Success
    }

    pub fn unlock(&mut self, tx: &Transaction) {
        for input in &tx.inputs {
            if let Some(utxo) = self.utxos.get_mut(&input.key_hash) {
                if utxo.lock_holder == Some(tx.id) {
                    utxo.clear_lock();
                }
            }
        }
    }

    /// Applies `tx`. Locks are advisory and not consulted here.
    ///
    /// Nothing is applied when an output would overflow its owner's UTXO.
    pub fn commit(&mut self, tx: &Transaction) -> TxResult {
        if self.is_duplicate(tx) {
            return TxResult::Duplicate;
        }
        if !self.outputs_fit(tx) {
            return TxResult::Invalid;
        }

        if tx.kind == TxKind::Payment {
            for input in &tx.inputs {
                self.utxos.remove(&input.key_hash);
            }
        }

        for output in &tx.outputs {
            self.utxos
                .entry(output.key_hash())
                .and_modify(|utxo| {
                    utxo.output.amount = utxo.output.amount.saturating_add(output.amount);
                    utxo.output.id = output.id;
                })
                .or_insert_with(|| Utxo::new(output.clone()));
        }

        self.history.push(tx.clone());
        TxResult::Success
    }

    /// Sum of every UTXO owned by `public_key`.
    pub fn balance(&self, public_key: &PublicKey) -> Amount {
        self.utxos
            .values()
            .filter(|utxo| &utxo.output.public_key == public_key)
            .map(|utxo| utxo.output.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spore_common::auth::ed25519::Ed25519Authenticator;
    use spore_common::auth::Authenticator;
    use spore_common::{Input, Output};

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn key(seed: u8) -> Ed25519Authenticator {
        Ed25519Authenticator::from_bytes(&[seed; 32]).unwrap()
    }

    fn funded(owner: &Ed25519Authenticator, coins: u64) -> LedgerState {
        let mut state = LedgerState::new();
        let mint = Transaction::mint(vec![Output::new(owner.public_key(), Amount::coins(coins))]);
        assert_eq!(state.commit(&mint), TxResult::Success);
        state
    }

    fn pay(from: &Ed25519Authenticator, to: &Ed25519Authenticator, coins: u64) -> Transaction {
        Transaction::payment(
            vec![Input::signed(from)],
            vec![Output::new(to.public_key(), Amount::coins(coins))],
        )
    }

    #[test]
    fn unbalanced_payment_is_invalid() {
        let (alice, bob) = (key(1), key(2));
        let state = funded(&alice, 10);

        assert_eq!(state.validate(&pay(&alice, &bob, 9)), TxResult::Invalid);
        assert_eq!(state.validate(&pay(&alice, &bob, 11)), TxResult::Invalid);
        assert_eq!(state.validate(&pay(&alice, &bob, 10)), TxResult::Success);
    }

    #[test]
    fn missing_utxo_fails_but_bad_signature_is_invalid() {
        let (alice, bob, carol) = (key(1), key(2), key(3));
        let state = funded(&alice, 10);

        assert_eq!(state.validate(&pay(&carol, &bob, 10)), TxResult::Fail);

        let mut forged = pay(&alice, &bob, 10);
        forged.inputs[0].signature = carol.sign(&key_hash_bytes(forged.inputs[0].key_hash));
        assert_eq!(state.validate(&forged), TxResult::Invalid);
    }

    #[test]
    fn reused_input_output_id_is_invalid() {
        let (alice, bob) = (key(1), key(2));
        let state = funded(&alice, 10);
        let utxo_id = state.utxos.values().next().unwrap().output.id;

        let mut tx = pay(&alice, &bob, 10);
        tx.outputs[0].id = utxo_id;
        assert_eq!(state.validate(&tx), TxResult::Invalid);
    }

    #[test]
    fn lock_is_exclusive_until_unlock_or_timeout() {
        let (alice, bob) = (key(1), key(2));
        let mut state = funded(&alice, 10);
        let first = pay(&alice, &bob, 10);
        let second = pay(&alice, &bob, 10);
        let t0 = Instant::now();

        assert_eq!(state.lock(&first, t0, TIMEOUT), TxResult::Success);
        assert_eq!(state.lock(&first, t0, TIMEOUT), TxResult::Success);
        assert_eq!(state.lock(&second, t0 + Duration::from_secs(1), TIMEOUT), TxResult::LockFail);

        // stale after the timeout
        assert_eq!(state.lock(&second, t0 + TIMEOUT, TIMEOUT), TxResult::Success);
        assert_eq!(state.lock(&first, t0 + TIMEOUT, TIMEOUT), TxResult::LockFail);

        state.unlock(&first);
        assert!(state.utxos.values().all(|u| u.lock_holder == Some(second.id)));
        state.unlock(&second);
        assert!(state.utxos.values().all(|u| !u.is_locked()));
        assert_eq!(state.lock(&first, t0, TIMEOUT), TxResult::Success);
    }

    #[test]
    fn failed_lock_leaves_no_partial_locks() {
        let (alice, bob, carol) = (key(1), key(2), key(3));
        let mut state = funded(&alice, 10);
        let mint = Transaction::mint(vec![Output::new(bob.public_key(), Amount::coins(5))]);
        state.commit(&mint);
        let now = Instant::now();

        let blocker = pay(&bob, &carol, 5);
        assert_eq!(state.lock(&blocker, now, TIMEOUT), TxResult::Success);

        let both = Transaction::payment(
            vec![Input::signed(&alice), Input::signed(&bob)],
            vec![Output::new(carol.public_key(), Amount::coins(15))],
        );
        assert_eq!(state.lock(&both, now, TIMEOUT), TxResult::LockFail);
        let alice_hash = spore_common::crypto::hash_public_key(&alice.public_key());
        assert!(!state.utxos[&alice_hash].is_locked());

        let ghost = pay(&carol, &alice, 1);
        assert_eq!(state.lock(&ghost, now, TIMEOUT), TxResult::Invalid);
    }

    #[test]
    fn commit_is_idempotent() {
        let (alice, bob) = (key(1), key(2));
        let mut state = funded(&alice, 10);
        let tx = pay(&alice, &bob, 10);

        assert_eq!(state.commit(&tx), TxResult::Success);
        let before = state.utxos.clone();
        let history = state.history.len();

        assert_eq!(state.commit(&tx), TxResult::Duplicate);
        assert_eq!(state.validate(&tx), TxResult::Duplicate);
        assert_eq!(state.utxos, before);
        assert_eq!(state.history.len(), history);
        assert_eq!(state.balance(&bob.public_key()), Amount::coins(10));
        assert_eq!(state.balance(&alice.public_key()), Amount::ZERO);
    }

    #[test]
    fn top_up_overflow_is_invalid_and_not_applied() {
        let (alice, bob) = (key(1), key(2));
        let mut state = LedgerState::new();
        let near_max = Amount::from_units(u64::MAX - 5);
        let first = Transaction::mint(vec![Output::new(alice.public_key(), near_max)]);
        assert_eq!(state.commit(&first), TxResult::Success);

        let second = Transaction::mint(vec![Output::new(alice.public_key(), Amount::from_units(100))]);
        assert_eq!(state.validate(&second), TxResult::Invalid);
        assert_eq!(state.commit(&second), TxResult::Invalid);
        assert_eq!(state.balance(&alice.public_key()), near_max);
        assert_eq!(state.history.len(), 1);

        // two outputs to one owner are summed before the check
        let split = Transaction::mint(vec![
            Output::new(bob.public_key(), Amount::from_units(u64::MAX - 1)),
            Output::new(bob.public_key(), Amount::from_units(2)),
        ]);
        assert_eq!(state.validate(&split), TxResult::Invalid);
        assert_eq!(state.commit(&split), TxResult::Invalid);
        assert_eq!(state.balance(&bob.public_key()), Amount::ZERO);

        // spending the big UTXO back to its owner does not count it twice
        let to_self = Transaction::payment(vec![Input::signed(&alice)], vec![Output::new(alice.public_key(), near_max)]);
        assert_eq!(state.validate(&to_self), TxResult::Success);
    }

    #[test]
    fn commit_tops_up_existing_owner() {
        let (alice, bob) = (key(1), key(2));
        let mut state = funded(&alice, 10);
        let second = Transaction::mint(vec![Output::new(bob.public_key(), Amount::coins(4))]);
        state.commit(&second);

        let tx = Transaction::payment(
            vec![Input::signed(&alice)],
            vec![
                Output::new(bob.public_key(), Amount::coins(6)),
                Output::new(alice.public_key(), Amount::coins(4)),
            ],
        );
        assert_eq!(state.validate(&tx), TxResult::Success);
        assert_eq!(state.commit(&tx), TxResult::Success);
        assert_eq!(state.balance(&bob.public_key()), Amount::coins(10));
        assert_eq!(state.balance(&alice.public_key()), Amount::coins(4));
    }
}
