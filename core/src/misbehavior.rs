//! Peer misbehavior classification (§3.1 Entity catalogue, §6 `getMisbehaviors`).
//!
//! The validation layer classifies *why* a peer was demerited; the scorer
//! and peer registry that *act* on this live in the excluded network layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MisbehaviorAction {
    InvalidBlock,
    InvalidTx,
    Timeout,
    Spam,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisbehaviorRecord {
    pub peer_id: String,
    pub action: MisbehaviorAction,
    pub count: u32,
    pub last_seen_at: u64,
}

impl MisbehaviorRecord {
    pub fn new(peer_id: String, action: MisbehaviorAction, at_ms: u64) -> Self {
        MisbehaviorRecord { peer_id, action, count: 1, last_seen_at: at_ms }
    }

    pub fn bump(&mut self, at_ms: u64) {
        self.count += 1;
        self.last_seen_at = at_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_increments_count_and_timestamp() {
        let mut record = MisbehaviorRecord::new("peer-1".to_string(), MisbehaviorAction::InvalidBlock, 100);
        record.bump(200);
        assert_eq!(record.count, 2);
        assert_eq!(record.last_seen_at, 200);
    }
}
