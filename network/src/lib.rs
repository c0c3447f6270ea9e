//! Message types exchanged between the sync/acceptor actors and the network
//! layer. The libp2p swarm/transport wiring that carries these messages is
//! out of scope; this crate only defines what crosses the boundary.

use serde::{Deserialize, Serialize};

use flowchain_core::chain::{Block, Transaction};
use flowchain_core::misbehavior::{MisbehaviorAction, MisbehaviorRecord};
use flowchain_core::primitives::{ChainIndex, Hash};

/// One peer, addressed the way libp2p addresses them: by their multiaddr-derived
/// peer id string. Kept opaque here since parsing/validating it is transport detail.
pub type PeerId = String;

/// Messages the acceptor/mempool actors send to or receive from peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NetworkMessage {
    /// A newly mined or relayed block, with the chain it belongs to.
    NewBlock { chain_index: ChainIndex, block: Block },
    /// A transaction a peer is relaying into our mempool.
    NewTx(Transaction),
    /// Catch-up request: every block after `from` on `chain_index`, optionally
    /// bounded at `to`.
    RequestBlocks { chain_index: ChainIndex, from: Hash, to: Option<Hash> },
    /// Reply to [`NetworkMessage::RequestBlocks`].
    BlocksResponse { chain_index: ChainIndex, blocks: Vec<Block> },
    /// Informs a peer that we rejected something it sent.
    Reject { reason: String },
}

/// Demerits one peer for `action`, folding into an existing record if the
/// peer already has one for the same action (§6 `getMisbehaviors`).
#[derive(Default)]
pub struct MisbehaviorLog {
    records: Vec<MisbehaviorRecord>,
}

impl MisbehaviorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, peer_id: PeerId, action: MisbehaviorAction, at_ms: u64) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.peer_id == peer_id && r.action == action) {
            existing.bump(at_ms);
        } else {
            self.records.push(MisbehaviorRecord::new(peer_id, action, at_ms));
        }
    }

    pub fn records(&self) -> &[MisbehaviorRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_reports_bump_the_same_record() {
        let mut log = MisbehaviorLog::new();
        log.report("peer-a".to_string(), MisbehaviorAction::Spam, 10);
        log.report("peer-a".to_string(), MisbehaviorAction::Spam, 20);
        assert_eq!(log.records().len(), 1);
        assert_eq!(log.records()[0].count, 2);
    }

    #[test]
    fn distinct_actions_get_distinct_records() {
        let mut log = MisbehaviorLog::new();
        log.report("peer-a".to_string(), MisbehaviorAction::Spam, 10);
        log.report("peer-a".to_string(), MisbehaviorAction::Timeout, 10);
        assert_eq!(log.records().len(), 2);
    }
}
