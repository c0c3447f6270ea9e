//! Fixed-width signature type and verification, grounded in the teacher
//! crate's direct use of `ed25519_dalek` for transaction signing.

use ed25519_dalek::{PublicKey, Signature as DalekSignature, Verifier};
use serde::{Deserialize, Serialize};

/// A 64-byte Ed25519 signature.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub [u8; 64]);

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed public key")]
    BadPublicKey,
    #[error("malformed signature bytes")]
    BadSignature,
    #[error("signature did not verify")]
    VerificationFailed,
}

impl Signature {
    /// Verifies `self` over `message` using `pubkey` (raw Ed25519 public key
    /// bytes, as carried by `TxInput`/`unlockScript`).
    pub fn verify(&self, pubkey: &[u8], message: &[u8]) -> Result<(), SignatureError> {
        let pk = PublicKey::from_bytes(pubkey).map_err(|_| SignatureError::BadPublicKey)?;
        let sig = DalekSignature::from_bytes(&self.0).map_err(|_| SignatureError::BadSignature)?;
        pk.verify(message, &sig).map_err(|_| SignatureError::VerificationFailed)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != 64 {
            return Err(SignatureError::BadSignature);
        }
        let mut arr = [0u8; 64];
        arr.copy_from_slice(bytes);
        Ok(Signature(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Keypair, SecretKey, Signer};

    fn deterministic_keypair() -> Keypair {
        let secret = SecretKey::from_bytes(&[7u8; 32]).unwrap();
        let public = PublicKey::from(&secret);
        Keypair { secret, public }
    }

    #[test]
    fn verifies_matching_signature() {
        let kp = deterministic_keypair();
        let msg = b"flowchain tx message";
        let sig = kp.sign(msg);
        let wrapped = Signature(sig.to_bytes());
        assert!(wrapped.verify(kp.public.as_bytes(), msg).is_ok());
    }

    #[test]
    fn rejects_tampered_message() {
        let kp = deterministic_keypair();
        let sig = kp.sign(b"original");
        let wrapped = Signature(sig.to_bytes());
        assert!(wrapped.verify(kp.public.as_bytes(), b"tampered").is_err());
    }
}
