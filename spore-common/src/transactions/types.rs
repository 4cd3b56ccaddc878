use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::amount::Amount;
use crate::auth::Authenticator;
use crate::crypto::{hash_public_key, key_hash_bytes, KeyHash, PublicKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxKind {
    Mint,
    Payment,
    BalanceQuery,
}

/// Spends the UTXO owned by `key_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub key_hash: KeyHash,
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
}

impl Input {
    /// Builds an input for the owner's UTXO, signing the owner-key-hash bytes.
    pub fn signed(owner: &dyn Authenticator) -> Self {
        let key_hash = hash_public_key(&owner.public_key());
        Self {
            key_hash,
            signature: owner.sign(&key_hash_bytes(key_hash)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub public_key: PublicKey,
    pub amount: Amount,
    pub id: Uuid,
}

impl Output {
    pub fn new(public_key: PublicKey, amount: Amount) -> Self {
        Self {
            public_key,
            amount,
            id: Uuid::new_v4(),
        }
    }

    pub fn key_hash(&self) -> KeyHash {
        hash_public_key(&self.public_key)
    }
}

/// A client request: mint, payment or balance query.
///
/// Immutable once built and signed; nodes only ever clone it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: TxKind,
    #[serde(default)]
    pub inputs: Vec<Input>,
    #[serde(default)]
    pub outputs: Vec<Output>,
}

impl Transaction {
    pub fn mint(outputs: Vec<Output>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TxKind::Mint,
            inputs: Vec::new(),
            outputs,
        }
    }

    pub fn payment(inputs: Vec<Input>, outputs: Vec<Output>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TxKind::Payment,
            inputs,
            outputs,
        }
    }

    /// One zero-amount output per key; the answering node fills in the amounts.
    pub fn balance_query(keys: &[PublicKey]) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TxKind::BalanceQuery,
            inputs: Vec::new(),
            outputs: keys
                .iter()
                .map(|pk| Output::new(*pk, Amount::ZERO))
                .collect(),
        }
    }

    pub fn is_payment(&self) -> bool {
        self.kind == TxKind::Payment
    }

    /// Sum of output amounts, `None` on overflow.
    pub fn coins_out(&self) -> Option<Amount> {
        Amount::checked_sum(self.outputs.iter().map(|o| o.amount))
    }
}
