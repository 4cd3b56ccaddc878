use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

use super::Authenticator;
use crate::crypto::{KeyError, PublicKey};

pub struct Ed25519Authenticator {
    keypair: SigningKey,
}

impl Ed25519Authenticator {
    pub fn new(keypair: SigningKey) -> Self {
        Self { keypair }
    }

    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut OsRng))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let secret: [u8; 32] = bytes.try_into().map_err(|_| KeyError::Length(bytes.len()))?;
        Ok(Self::new(SigningKey::from_bytes(&secret)))
    }
}

impl Authenticator for Ed25519Authenticator {
    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.keypair.sign(message).to_vec()
    }

    fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(self.keypair.verifying_key().to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verify_signature;

    #[test]
    fn test_ed25519_signing_and_verification() {
        let auth = Ed25519Authenticator::generate();

        let message = b"hello world";
        let signature = auth.sign(message);
        assert_eq!(signature.len(), 64);

        assert!(verify_signature(&auth.public_key(), message, &signature));
        assert!(!verify_signature(&auth.public_key(), b"wrong message", &signature));

        let other = Ed25519Authenticator::from_bytes(&[7u8; 32]).unwrap();
        assert!(!verify_signature(&other.public_key(), message, &signature));
        assert!(!verify_signature(&auth.public_key(), message, &signature[..10]));
    }
}
