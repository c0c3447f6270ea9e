//! Block and BlockHeader (§3 Block). Identity is `hash(header)`; the
//! `chainIndex(block) = (hash % G, (hash / G) % G)` invariant is checked by
//! validation (§4.4), not enforced by the type itself.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::primitives::{ChainIndex, Hash, Target};
use crate::chain::transaction::Transaction;

/// `{blockDeps, depStateHash, txsHash, timestamp, target, nonce, version}`.
///
/// `block_deps` is the ordered sequence of `2G-1` parent hashes: one per
/// other chain group, plus the previous block in this chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub block_deps: Vec<Hash>,
    pub dep_state_hash: Hash,
    pub txs_hash: Hash,
    pub timestamp: u64,
    pub target: Target,
    pub nonce: [u8; 24],
    pub version: u8,
}

impl BlockHeader {
    /// Identity hash. Blake2b family, matching the teacher crate's existing
    /// header-hashing choice and kept in a distinct collision domain from
    /// transaction/trie hashes (SPEC_FULL.md §9).
    pub fn hash(&self) -> Hash {
        let encoded = codec::encode(self).expect("header encodes");
        Hash::blake2b(&encoded)
    }

    /// The previous block on this same chain: by convention the last entry
    /// in `block_deps` (§3: "one per other chain group plus the previous
    /// block in-chain").
    pub fn in_chain_parent(&self) -> Option<Hash> {
        self.block_deps.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Hash of the transaction sequence, compared against `header.txs_hash`
    /// during validation (§4.4).
    pub fn compute_txs_hash(transactions: &[Transaction]) -> Hash {
        let encoded = codec::encode(&transactions.to_vec()).expect("txs encode");
        Hash::keccak(&encoded)
    }

    pub fn chain_index(&self, group_num: u32) -> ChainIndex {
        ChainIndex::from_hash(&self.hash(), group_num)
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first()
    }

    /// Brute-force nonce search until the header both meets `target` and
    /// lands on `chain_index` — a naive single-threaded loop suitable only
    /// for low-difficulty test fixtures (§9: real mining is out of scope
    /// beyond this). Consumes `self` so a half-mined block can't leak out.
    pub fn mine_for_chain(mut self, chain_index: ChainIndex, group_num: u32) -> Self {
        loop {
            let hash = self.hash();
            if crate::pow::hash_meets_target(&hash, &self.header.target) && ChainIndex::from_hash(&hash, group_num) == chain_index {
                return self;
            }
            increment_nonce(&mut self.header.nonce);
        }
    }
}

fn increment_nonce(nonce: &mut [u8; 24]) {
    for byte in nonce.iter_mut() {
        let (next, overflowed) = byte.overflowing_add(1);
        *byte = next;
        if !overflowed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::transaction::Transaction;
    use crate::primitives::Address;

    fn sample_header(nonce: u8) -> BlockHeader {
        BlockHeader {
            block_deps: vec![Hash::ZERO; 3],
            dep_state_hash: Hash::ZERO,
            txs_hash: Hash::ZERO,
            timestamp: 1,
            target: Target::GENESIS,
            nonce: [nonce; 24],
            version: 0,
        }
    }

    #[test]
    fn header_hash_changes_with_nonce() {
        let a = sample_header(0);
        let b = sample_header(1);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn block_hash_is_header_hash() {
        let block = Block { header: sample_header(0), transactions: vec![] };
        assert_eq!(block.hash(), block.header.hash());
    }

    #[test]
    fn in_chain_parent_is_last_dep() {
        let mut header = sample_header(0);
        header.block_deps = vec![Hash::blake2b(b"a"), Hash::blake2b(b"self-chain-parent")];
        assert_eq!(header.in_chain_parent(), Some(Hash::blake2b(b"self-chain-parent")));
    }

    #[test]
    fn mine_for_chain_finds_matching_nonce() {
        let header = sample_header(0);
        let block = Block { header, transactions: vec![] };
        let chain_index = block.chain_index(2);
        let mined = block.mine_for_chain(chain_index, 2);
        assert!(crate::pow::hash_meets_target(&mined.hash(), &mined.header.target));
        assert_eq!(mined.chain_index(2), chain_index);
    }

    #[test]
    fn txs_hash_matches_coinbase_only_block() {
        let cb = Transaction::coinbase(
            primitive_types::U256::from(50u64),
            Address::P2PKH(Hash::blake2b(b"miner")),
            0,
        );
        let txs = vec![cb];
        let hash1 = Block::compute_txs_hash(&txs);
        let hash2 = Block::compute_txs_hash(&txs);
        assert_eq!(hash1, hash2);
    }
}
