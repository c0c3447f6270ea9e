//! Fixed-width 32-byte hashes and the two hash families the wire format mixes
//! (DESIGN NOTES open question, resolved in SPEC_FULL.md/DESIGN.md): Blake2b
//! for header/PoW identity, Keccak family (SHA3-256) for transaction identity
//! and world-state trie nodes.

use std::fmt;

use blake2::{Blake2b512, Digest as _};
use serde::{Deserialize, Serialize};
use sha3::{Digest as _, Sha3_256};

/// A 32-byte content-addressed identifier. Canonical serialization is the
/// raw bytes, no length prefix (§6 wire format: fixed-width values are
/// fixed-width on the wire too).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    /// Blake2b-512 truncated to 32 bytes. Used for header/block identity and
    /// PoW, matching the teacher crate's existing hash choice.
    pub fn blake2b(data: &[u8]) -> Self {
        let digest = Blake2b512::digest(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest[..32]);
        Hash(out)
    }

    /// SHA3-256 (Keccak family). Used for transaction identity and trie
    /// node hashing, kept in a separate collision domain from PoW.
    pub fn keccak(data: &[u8]) -> Self {
        let digest = Sha3_256::digest(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Hash(out)
    }

    /// Hashes two hashes together (trie/merkle-tree internal nodes).
    pub fn combine(left: &Hash, right: &Hash) -> Self {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&left.0);
        buf[32..].copy_from_slice(&right.0);
        Self::keccak(&buf)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        if bytes.len() != 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Some(Hash(out))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_determinism() {
        let a = Hash::blake2b(b"flowchain");
        let b = Hash::blake2b(b"flowchain");
        assert_eq!(a, b);
    }

    #[test]
    fn different_families_diverge() {
        let a = Hash::blake2b(b"flowchain");
        let b = Hash::keccak(b"flowchain");
        assert_ne!(a, b);
    }

    #[test]
    fn hex_round_trip() {
        let h = Hash::blake2b(b"round trip");
        let hex = h.to_hex();
        assert_eq!(Hash::from_hex(&hex), Some(h));
    }

    #[test]
    fn ordering_is_lexicographic_on_bytes() {
        let a = Hash([0u8; 32]);
        let mut b_bytes = [0u8; 32];
        b_bytes[31] = 1;
        let b = Hash(b_bytes);
        assert!(a < b);
    }
}
