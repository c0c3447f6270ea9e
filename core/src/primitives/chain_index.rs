//! `ChainIndex`: the `(from, to)` pair identifying one of the `G*G` chains.

use serde::{Deserialize, Serialize};

use crate::primitives::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainIndex {
    pub from: u32,
    pub to: u32,
}

impl ChainIndex {
    pub fn new(from: u32, to: u32) -> Self {
        ChainIndex { from, to }
    }

    /// Derives the chain a block belongs to from its own hash: `chainIndex(block)
    /// = (hash % G, (hash / G) % G)` (§3 Block invariant). Mining searches the
    /// nonce until this matches the block's declared header fields.
    pub fn from_hash(hash: &Hash, group_num: u32) -> ChainIndex {
        let value = primitive_types::U256::from_big_endian(hash.as_bytes());
        let g = primitive_types::U256::from(group_num);
        let from = (value % g).as_u32();
        let to = ((value / g) % g).as_u32();
        ChainIndex::new(from, to)
    }

    pub fn is_valid(&self, group_num: u32) -> bool {
        self.from < group_num && self.to < group_num
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_index_is_in_range() {
        let hash = Hash::blake2b(b"some block header bytes");
        let idx = ChainIndex::from_hash(&hash, 4);
        assert!(idx.is_valid(4));
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(ChainIndex::new(0, 1) < ChainIndex::new(0, 2));
        assert!(ChainIndex::new(0, 3) < ChainIndex::new(1, 0));
    }
}
