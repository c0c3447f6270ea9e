//! Addresses: a tagged union over the four lockup-script kinds, encoded as
//! `base58check(tag_byte || payload)` (§6 Address encoding).

use serde::{Deserialize, Serialize};

use crate::primitives::Hash;

const TAG_P2PKH: u8 = 0;
const TAG_P2MPKH: u8 = 1;
const TAG_P2SH: u8 = 2;
const TAG_P2C: u8 = 3;

/// A spendable destination. Never carries a signature or script itself —
/// only enough to construct (or recognize) the corresponding lockup script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Address {
    /// Pay-to-public-key-hash: spendable by a single signature.
    P2PKH(Hash),
    /// Multisig: `m`-of-`hashes.len()` public key hashes.
    P2MPKH { m: u8, hashes: Vec<Hash> },
    /// Pay-to-script-hash: spendable by revealing a script matching the hash.
    P2SH(Hash),
    /// Pay-to-contract: the address of a contract instance.
    P2C(Hash),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressDecodeError {
    #[error("invalid base58check encoding")]
    InvalidBase58,
    #[error("unknown address tag byte {0}")]
    UnknownTag(u8),
    #[error("payload length does not match tag")]
    BadPayloadLength,
    #[error("empty payload")]
    Empty,
}

impl Address {
    fn tag(&self) -> u8 {
        match self {
            Address::P2PKH(_) => TAG_P2PKH,
            Address::P2MPKH { .. } => TAG_P2MPKH,
            Address::P2SH(_) => TAG_P2SH,
            Address::P2C(_) => TAG_P2C,
        }
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            Address::P2PKH(h) | Address::P2SH(h) | Address::P2C(h) => h.as_bytes().to_vec(),
            Address::P2MPKH { m, hashes } => {
                let mut buf = Vec::with_capacity(1 + hashes.len() * 32);
                buf.push(*m);
                for h in hashes {
                    buf.extend_from_slice(h.as_bytes());
                }
                buf
            }
        }
    }

    /// Encodes as `base58check(tag_byte || payload)`. `bs58`'s `with_check`
    /// variant appends the checksum, matching the "check" in base58check.
    pub fn encode(&self) -> String {
        let mut buf = Vec::with_capacity(33);
        buf.push(self.tag());
        buf.extend(self.payload());
        bs58::encode(buf).with_check().into_string()
    }

    pub fn decode(s: &str) -> Result<Self, AddressDecodeError> {
        let bytes = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|_| AddressDecodeError::InvalidBase58)?;
        let (tag, payload) = bytes.split_first().ok_or(AddressDecodeError::Empty)?;
        match *tag {
            TAG_P2PKH => Ok(Address::P2PKH(hash_from_slice(payload)?)),
            TAG_P2SH => Ok(Address::P2SH(hash_from_slice(payload)?)),
            TAG_P2C => Ok(Address::P2C(hash_from_slice(payload)?)),
            TAG_P2MPKH => {
                let (m, rest) = payload.split_first().ok_or(AddressDecodeError::BadPayloadLength)?;
                if rest.len() % 32 != 0 {
                    return Err(AddressDecodeError::BadPayloadLength);
                }
                let hashes = rest
                    .chunks_exact(32)
                    .map(|chunk| {
                        let mut arr = [0u8; 32];
                        arr.copy_from_slice(chunk);
                        Hash::from_bytes(arr)
                    })
                    .collect();
                Ok(Address::P2MPKH { m: *m, hashes })
            }
            other => Err(AddressDecodeError::UnknownTag(other)),
        }
    }
}

fn hash_from_slice(payload: &[u8]) -> Result<Hash, AddressDecodeError> {
    if payload.len() != 32 {
        return Err(AddressDecodeError::BadPayloadLength);
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(payload);
    Ok(Hash::from_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2pkh_round_trip() {
        let addr = Address::P2PKH(Hash::blake2b(b"pubkey"));
        let encoded = addr.encode();
        assert_eq!(Address::decode(&encoded).unwrap(), addr);
    }

    #[test]
    fn p2mpkh_round_trip() {
        let addr = Address::P2MPKH {
            m: 2,
            hashes: vec![Hash::blake2b(b"a"), Hash::blake2b(b"b"), Hash::blake2b(b"c")],
        };
        let encoded = addr.encode();
        assert_eq!(Address::decode(&encoded).unwrap(), addr);
    }

    #[test]
    fn p2c_round_trip() {
        let addr = Address::P2C(Hash::keccak(b"contract"));
        let encoded = addr.encode();
        assert_eq!(Address::decode(&encoded).unwrap(), addr);
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let addr = Address::P2PKH(Hash::blake2b(b"pubkey"));
        let mut encoded = addr.encode();
        encoded.push('z');
        assert!(Address::decode(&encoded).is_err());
    }

    #[test]
    fn unknown_tag_rejected() {
        let payload = [99u8; 33];
        let bogus = bs58::encode(payload).with_check().into_string();
        assert_eq!(Address::decode(&bogus), Err(AddressDecodeError::UnknownTag(99)));
    }
}
