pub mod hash;
pub mod keys;

pub use hash::{hash_public_key, key_hash_bytes, KeyHash};
pub use keys::{verify_signature, KeyError, PublicKey};
