pub mod ed25519;

use crate::crypto::PublicKey;

/// Signing side of the key pair. Verification is key-only and lives in
/// [`crate::crypto::verify_signature`].
pub trait Authenticator: Send + Sync {
    fn sign(&self, message: &[u8]) -> Vec<u8>;
    fn public_key(&self) -> PublicKey;
}
