//! Pending-transaction pool (§4.3.1): indexed by tx hash, secondarily by
//! `(gasPrice desc, insertion order)` for template selection and by consumed
//! `OutputRef`s to reject conflicting transactions early.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chain::{OutputRef, Transaction};
use crate::error::Result;
use crate::primitives::{Hash, U256};

/// One pending transaction plus the bookkeeping needed to select or evict it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolEntry {
    pub tx: Transaction,
    pub added_at: u64,
    pub gas_price: U256,
}

/// Transactions not yet included in a block. `submitTx` (§6) validates and
/// inserts here; `prepareBlockFlowUnsafe` (§4.3) drains it in priority order.
#[derive(Default)]
pub struct Mempool {
    entries: HashMap<Hash, MempoolEntry>,
    /// Consumed `OutputRef` -> the tx hash that consumes it, for O(1) conflict
    /// detection before a second spend of the same output reaches a block.
    spent_by: HashMap<OutputRef, Hash>,
    ttl_ms: u64,
}

impl Mempool {
    pub fn new(ttl_ms: u64) -> Self {
        Mempool { entries: HashMap::new(), spent_by: HashMap::new(), ttl_ms }
    }

    /// True if any input of `tx` conflicts with an already-pooled tx.
    pub fn conflicts(&self, tx: &Transaction) -> bool {
        tx.unsigned.inputs.iter().any(|input| self.spent_by.contains_key(&input.output_ref))
    }

    /// Inserts `tx`, keyed by its hash. Returns `false` without mutating the
    /// pool if any input conflicts with an existing entry.
    pub fn insert(&mut self, tx: Transaction, added_at: u64) -> bool {
        if self.conflicts(&tx) {
            return false;
        }
        let hash = tx.hash();
        let gas_price = tx.unsigned.gas_price;
        for input in &tx.unsigned.inputs {
            self.spent_by.insert(input.output_ref.clone(), hash);
        }
        self.entries.insert(hash, MempoolEntry { tx, added_at, gas_price });
        true
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes `hash` (a block confirmed it, or it went stale), releasing
    /// the `OutputRef`s it had reserved.
    pub fn remove(&mut self, hash: &Hash) -> Option<MempoolEntry> {
        let entry = self.entries.remove(hash)?;
        for input in &entry.tx.unsigned.inputs {
            if self.spent_by.get(&input.output_ref) == Some(hash) {
                self.spent_by.remove(&input.output_ref);
            }
        }
        Some(entry)
    }

    /// Drops every entry older than `ttl_ms` relative to `now_ms`.
    pub fn evict_stale(&mut self, now_ms: u64) {
        let stale: Vec<Hash> = self
            .entries
            .iter()
            .filter(|(_, e)| now_ms.saturating_sub(e.added_at) > self.ttl_ms)
            .map(|(h, _)| *h)
            .collect();
        for hash in stale {
            self.remove(&hash);
        }
    }

    /// Candidates ordered by `gasPrice` descending, ties broken by earliest
    /// `added_at` (insertion order), for block-template selection (§4.3).
    pub fn ordered_candidates(&self) -> Vec<&MempoolEntry> {
        let mut entries: Vec<&MempoolEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| b.gas_price.cmp(&a.gas_price).then(a.added_at.cmp(&b.added_at)));
        entries
    }

    /// Snapshots every entry for the `mempool` column family. Unlike blocks
    /// and transactions, this never needs to agree byte-for-byte with a
    /// remote peer, so it uses `bincode` rather than the canonical codec.
    pub fn to_snapshot(&self) -> Result<Vec<u8>> {
        let entries: Vec<&MempoolEntry> = self.entries.values().collect();
        bincode::serialize(&entries).map_err(Into::into)
    }

    /// Restores a pool from a snapshot written by [`Mempool::to_snapshot`],
    /// rebuilding the `spent_by` index as each entry is re-inserted.
    pub fn from_snapshot(bytes: &[u8], ttl_ms: u64) -> Result<Self> {
        let entries: Vec<MempoolEntry> = bincode::deserialize(bytes)?;
        let mut pool = Mempool::new(ttl_ms);
        for entry in entries {
            pool.insert(entry.tx, entry.added_at);
        }
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Transaction;
    use crate::primitives::Address;

    fn tx_with_gas_price(price: u64) -> Transaction {
        let mut tx = Transaction::coinbase(U256::from(1u64), Address::P2PKH(Hash::blake2b(b"m")), 0);
        tx.unsigned.gas_price = U256::from(price);
        tx
    }

    #[test]
    fn ordered_candidates_sort_by_gas_price_desc() {
        let mut pool = Mempool::new(60_000);
        pool.insert(tx_with_gas_price(1), 0);
        pool.insert(tx_with_gas_price(5), 1);
        pool.insert(tx_with_gas_price(3), 2);
        let prices: Vec<U256> = pool.ordered_candidates().iter().map(|e| e.gas_price).collect();
        assert_eq!(prices, vec![U256::from(5u64), U256::from(3u64), U256::from(1u64)]);
    }

    #[test]
    fn remove_releases_conflict_reservation() {
        let mut pool = Mempool::new(60_000);
        let tx = tx_with_gas_price(1);
        let hash = tx.hash();
        pool.insert(tx, 0);
        pool.remove(&hash);
        assert!(pool.is_empty());
    }

    #[test]
    fn evict_stale_drops_old_entries() {
        let mut pool = Mempool::new(1_000);
        let tx = tx_with_gas_price(1);
        let hash = tx.hash();
        pool.insert(tx, 0);
        pool.evict_stale(5_000);
        assert!(!pool.contains(&hash));
    }

    #[test]
    fn snapshot_round_trips_pooled_transactions() {
        let mut pool = Mempool::new(60_000);
        let tx = tx_with_gas_price(7);
        let hash = tx.hash();
        pool.insert(tx, 3);
        let bytes = pool.to_snapshot().expect("snapshot");
        let restored = Mempool::from_snapshot(&bytes, 60_000).expect("restore");
        assert!(restored.contains(&hash));
        assert_eq!(restored.len(), pool.len());
    }
}
