use sha2::{Digest, Sha256};

use super::keys::PublicKey;

/// Identifier of a UTXO: the hash of its owner's public key.
pub type KeyHash = u64;

/// Deterministic owner-key hash: the first 8 bytes of SHA-256(public key), big-endian.
pub fn hash_public_key(public_key: &PublicKey) -> KeyHash {
    let digest = Sha256::digest(public_key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Bytes an owner signs to authorize spending the UTXO stored under `hash`.
pub fn key_hash_bytes(hash: KeyHash) -> [u8; 8] {
    hash.to_be_bytes()
}
