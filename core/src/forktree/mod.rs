//! Per-chain fork tree (§4.2): the tree of blocks belonging to a single
//! chain index, with tip tracking, pruning and a monotonic confirmed prefix.
//!
//! Grounded in the teacher's `core/src/ledger.rs` chain-of-blocks bookkeeping,
//! generalized from a single linear chain to a tree with tip set, weight
//! comparisons and confirmation depth.

use std::collections::{HashMap, HashSet};

use crate::chain::Block;
use crate::primitives::{Hash, U256};

/// Arena index into [`ForkTree::nodes`]. Never reused once assigned, even
/// after the node it named is pruned — callers hold only [`Hash`]es across
/// calls, never a raw `NodeId`.
type NodeId = usize;

struct Node {
    hash: Hash,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    height: u64,
    weight: U256,
    block: Block,
}

/// Outcome of [`ForkTree::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddResult {
    Success,
    AlreadyExists,
    MissingDeps(Hash),
}

/// The tree of blocks observed for one chain index, plus derived tip/weight
/// bookkeeping and a pruned, confirmed prefix.
pub struct ForkTree {
    nodes: Vec<Node>,
    index: HashMap<Hash, NodeId>,
    tips: HashSet<NodeId>,
    /// Confirmed main-line prefix, oldest first. Monotonically growing;
    /// never rolled back (§4.2 Confirmation).
    confirmed: Vec<NodeId>,
    confirm_depth: u64,
}

impl ForkTree {
    /// Seeds the tree with `genesis` as the root, at height 0 and weight
    /// equal to its own PoW contribution.
    pub fn new(genesis: Block, genesis_weight: U256, confirm_depth: u64) -> Self {
        let hash = genesis.hash();
        let root = Node { hash, parent: None, children: Vec::new(), height: 0, weight: genesis_weight, block: genesis };
        let mut tree = ForkTree { nodes: vec![root], index: HashMap::new(), tips: HashSet::new(), confirmed: Vec::new(), confirm_depth };
        tree.index.insert(hash, 0);
        tree.tips.insert(0);
        tree
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.index.contains_key(hash)
    }

    fn node(&self, hash: &Hash) -> &Node {
        let id = self.index[hash];
        &self.nodes[id]
    }

    pub fn get_block(&self, hash: &Hash) -> &Block {
        &self.node(hash).block
    }

    pub fn get_height(&self, hash: &Hash) -> u64 {
        self.node(hash).height
    }

    pub fn get_weight(&self, hash: &Hash) -> U256 {
        self.node(hash).weight
    }

    pub fn num_blocks(&self) -> usize {
        self.nodes.len()
    }

    pub fn max_height(&self) -> u64 {
        self.tips.iter().map(|&id| self.nodes[id].height).max().unwrap_or(0)
    }

    pub fn max_weight(&self) -> U256 {
        self.tips.iter().map(|&id| self.nodes[id].weight).max().unwrap_or(U256::zero())
    }

    pub fn is_tip(&self, hash: &Hash) -> bool {
        self.index.get(hash).is_some_and(|id| self.tips.contains(id))
    }

    pub fn get_all_tips(&self) -> Vec<Hash> {
        self.tips.iter().map(|&id| self.nodes[id].hash).collect()
    }

    /// Max height, then max weight, then lexicographically-smallest hash
    /// (§9 resolved open question: deterministic, cheap tie-break).
    pub fn get_best_tip(&self) -> Hash {
        self.tips
            .iter()
            .map(|&id| &self.nodes[id])
            .max_by(|a, b| (a.height, a.weight, std::cmp::Reverse(a.hash)).cmp(&(b.height, b.weight, std::cmp::Reverse(b.hash))))
            .map(|n| n.hash)
            .expect("fork tree always has at least the genesis tip")
    }

    /// Inserts `block` under its declared in-chain parent.
    pub fn add(&mut self, block: Block, weight: U256) -> AddResult {
        let hash = block.hash();
        if self.index.contains_key(&hash) {
            return AddResult::AlreadyExists;
        }
        let Some(parent_hash) = block.header.in_chain_parent() else {
            return AddResult::MissingDeps(Hash::ZERO);
        };
        let Some(&parent_id) = self.index.get(&parent_hash) else {
            return AddResult::MissingDeps(parent_hash);
        };
        let height = self.nodes[parent_id].height + 1;
        let new_id = self.nodes.len();
        self.nodes.push(Node { hash, parent: Some(parent_id), children: Vec::new(), height, weight, block });
        self.nodes[parent_id].children.push(new_id);
        self.index.insert(hash, new_id);
        self.tips.remove(&parent_id);
        self.tips.insert(new_id);

        self.prune_due_to(new_id);
        self.confirm_blocks();
        AddResult::Success
    }

    /// Walks from every tip `T` with `H >= T.height + K` toward the root,
    /// removing nodes while their parent has exactly one remaining child.
    fn prune_due_to(&mut self, added: NodeId) {
        let h = self.nodes[added].height;
        let k = self.confirm_depth;
        let stale_tips: Vec<NodeId> = self
            .tips
            .iter()
            .copied()
            .filter(|&t| t != added && h >= self.nodes[t].height + k)
            .collect();
        for tip in stale_tips {
            self.prune_branch(tip);
        }
    }

    fn prune_branch(&mut self, mut id: NodeId) {
        loop {
            let Some(parent_id) = self.nodes[id].parent else { break };
            self.tips.remove(&id);
            self.index.remove(&self.nodes[id].hash);
            let parent = &mut self.nodes[parent_id];
            parent.children.retain(|&c| c != id);
            let parent_children_len = parent.children.len();
            if parent_children_len == 1 && !self.tips.contains(&parent_id) {
                id = parent_id;
            } else {
                break;
            }
        }
    }

    /// Extends `confirmed` while the next candidate has exactly one child and
    /// the oldest live tip is at least `K` blocks ahead of it.
    fn confirm_blocks(&mut self) {
        if self.confirmed.is_empty() {
            if self.nodes[0].children.len() == 1 {
                self.confirmed.push(0);
            } else {
                return;
            }
        }
        loop {
            let last = *self.confirmed.last().expect("seeded above");
            if self.nodes[last].children.len() != 1 {
                break;
            }
            let oldest_tip_height = self.tips.iter().map(|&t| self.nodes[t].height).min().unwrap_or(0);
            if oldest_tip_height < self.nodes[last].height + self.confirm_depth {
                break;
            }
            let next = self.nodes[last].children[0];
            self.confirmed.push(next);
        }
    }

    pub fn get_confirmed_block(&self, height: u64) -> Option<&Block> {
        self.confirmed.iter().map(|&id| &self.nodes[id]).find(|n| n.height == height).map(|n| &n.block)
    }

    /// True iff `a` is an ancestor of (or equal to) `b`.
    pub fn is_before(&self, a: &Hash, b: &Hash) -> bool {
        if a == b {
            return true;
        }
        let Some(&a_id) = self.index.get(a) else { return false };
        let Some(&b_id) = self.index.get(b) else { return false };
        let a_height = self.nodes[a_id].height;
        let mut cur = b_id;
        while self.nodes[cur].height > a_height {
            match self.nodes[cur].parent {
                Some(p) => cur = p,
                None => return false,
            }
        }
        cur == a_id
    }

    /// The ancestor chain from root to `hash`, inclusive, oldest first.
    pub fn get_block_slice(&self, hash: &Hash) -> Vec<Hash> {
        let mut out = Vec::new();
        let Some(&start) = self.index.get(hash) else { return out };
        let mut id = start;
        loop {
            out.push(self.nodes[id].hash);
            match self.nodes[id].parent {
                Some(p) => id = p,
                None => break,
            }
        }
        out.reverse();
        out
    }

    /// All descendants of `hash`, in no particular order (catch-up replies).
    pub fn get_blocks_after(&self, hash: &Hash) -> Vec<Hash> {
        let mut out = Vec::new();
        let Some(&start) = self.index.get(hash) else { return out };
        let mut stack = self.nodes[start].children.clone();
        while let Some(id) = stack.pop() {
            out.push(self.nodes[id].hash);
            stack.extend(self.nodes[id].children.iter().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::BlockHeader;
    use crate::primitives::Target;

    fn child_of(parent: &Block, nonce: u8) -> Block {
        let header = BlockHeader {
            block_deps: vec![parent.hash()],
            dep_state_hash: Hash::ZERO,
            txs_hash: Block::compute_txs_hash(&[]),
            timestamp: parent.header.timestamp + 1,
            target: Target::GENESIS,
            nonce: [nonce; 24],
            version: 0,
        };
        Block { header, transactions: vec![] }
    }

    fn genesis() -> Block {
        let header = BlockHeader {
            block_deps: vec![],
            dep_state_hash: Hash::ZERO,
            txs_hash: Block::compute_txs_hash(&[]),
            timestamp: 0,
            target: Target::GENESIS,
            nonce: [0; 24],
            version: 0,
        };
        Block { header, transactions: vec![] }
    }

    #[test]
    fn add_extends_best_tip_and_height() {
        let genesis = genesis();
        let genesis_hash = genesis.hash();
        let mut tree = ForkTree::new(genesis, U256::one(), 100);
        let b1 = child_of(&tree.get_block(&genesis_hash).clone(), 1);
        let b1_hash = b1.hash();
        assert_eq!(tree.add(b1, U256::from(2u64)), AddResult::Success);
        assert_eq!(tree.get_best_tip(), b1_hash);
        assert_eq!(tree.get_height(&b1_hash), 1);
        assert!(!tree.is_tip(&genesis_hash));
    }

    #[test]
    fn add_missing_parent_reports_missing_deps() {
        let mut tree = ForkTree::new(genesis(), U256::one(), 100);
        let orphan_parent = child_of(&genesis(), 9);
        let orphan = child_of(&orphan_parent, 1);
        let expected_missing = orphan_parent.hash();
        assert_eq!(tree.add(orphan, U256::from(2u64)), AddResult::MissingDeps(expected_missing));
    }

    #[test]
    fn duplicate_add_is_already_exists() {
        let genesis = genesis();
        let genesis_hash = genesis.hash();
        let mut tree = ForkTree::new(genesis, U256::one(), 100);
        let b1 = child_of(&tree.get_block(&genesis_hash).clone(), 1);
        tree.add(b1.clone(), U256::from(2u64));
        assert_eq!(tree.add(b1, U256::from(2u64)), AddResult::AlreadyExists);
    }

    #[test]
    fn is_before_detects_ancestry() {
        let genesis = genesis();
        let genesis_hash = genesis.hash();
        let mut tree = ForkTree::new(genesis, U256::one(), 100);
        let b1 = child_of(&tree.get_block(&genesis_hash).clone(), 1);
        let b1_hash = b1.hash();
        tree.add(b1, U256::from(2u64));
        let b2 = child_of(tree.get_block(&b1_hash), 2);
        let b2_hash = b2.hash();
        tree.add(b2, U256::from(3u64));
        assert!(tree.is_before(&genesis_hash, &b2_hash));
        assert!(!tree.is_before(&b2_hash, &genesis_hash));
    }

    #[test]
    fn confirmation_grows_monotonically_once_depth_reached() {
        let genesis = genesis();
        let genesis_hash = genesis.hash();
        let mut tree = ForkTree::new(genesis, U256::one(), 2);
        let mut prev_hash = genesis_hash;
        for i in 1..=4u8 {
            let parent = tree.get_block(&prev_hash).clone();
            let next = child_of(&parent, i);
            prev_hash = next.hash();
            tree.add(next, U256::from(i as u64 + 1));
        }
        assert!(tree.get_confirmed_block(0).is_some());
        assert!(tree.get_confirmed_block(1).is_some());
    }
}
