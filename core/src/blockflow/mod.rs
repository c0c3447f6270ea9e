//! Multi-chain composition over a G×G grid of [`ForkTree`]s (§4.3): chooses
//! each chain's next-block dependencies, exposes the world-state view they
//! imply, and assembles block templates from the mempool.

pub mod mempool;

use std::collections::{HashMap, HashSet};

use crate::chain::{Block, OutputRef, Transaction};
use crate::error::{Error, Result};
use crate::forktree::{AddResult, ForkTree};
use crate::primitives::{Address, ChainIndex, Hash, U256};
use crate::worldstate::WorldState;

pub use mempool::{Mempool, MempoolEntry};

/// A prepared-but-unmined block: chosen deps, selected transactions (coinbase
/// first), and the post-state commitment the header's `depStateHash` must
/// match (§4.3 `prepareBlockFlowUnsafe`). "Unsafe" because nonce search and
/// re-validation against a possibly-moved tip still happen after this.
pub struct BlockTemplate {
    pub block_deps: Vec<Hash>,
    pub transactions: Vec<Transaction>,
    pub dep_state_hash: Hash,
}

/// A grid of `group_num * group_num` per-chain [`ForkTree`]s, kept
/// internally consistent by [`BlockFlow::add_and_update_view`].
pub struct BlockFlow {
    group_num: u32,
    trees: HashMap<ChainIndex, ForkTree>,
    confirm_depth: u64,
}

impl BlockFlow {
    /// Seeds every chain `(i, j)` for `i, j < group_num` with its own genesis
    /// block (`genesis_for` supplies one per chain, since each chain's
    /// genesis hash must itself satisfy that chain's index invariant).
    pub fn new(group_num: u32, confirm_depth: u64, genesis_for: impl Fn(ChainIndex) -> Block) -> Self {
        let mut trees = HashMap::new();
        for from in 0..group_num {
            for to in 0..group_num {
                let idx = ChainIndex::new(from, to);
                let genesis = genesis_for(idx);
                trees.insert(idx, ForkTree::new(genesis, U256::one(), confirm_depth));
            }
        }
        BlockFlow { group_num, trees, confirm_depth }
    }

    pub fn group_num(&self) -> u32 {
        self.group_num
    }

    fn tree(&self, idx: ChainIndex) -> &ForkTree {
        self.trees.get(&idx).expect("chain index always seeded at construction")
    }

    fn tree_mut(&mut self, idx: ChainIndex) -> &mut ForkTree {
        self.trees.get_mut(&idx).expect("chain index always seeded at construction")
    }

    pub fn get_best_tip(&self, idx: ChainIndex) -> Hash {
        self.tree(idx).get_best_tip()
    }

    pub fn get_all_tips(&self, idx: ChainIndex) -> Vec<Hash> {
        self.tree(idx).get_all_tips()
    }

    /// Looks up `hash` across every chain, for callers (`getBlock`, §6) that
    /// only have the block hash and not which chain produced it.
    pub fn find_block(&self, hash: &Hash) -> Option<&Block> {
        self.trees.values().find(|tree| tree.contains(hash)).map(|tree| tree.get_block(hash))
    }

    /// Current chain height: the best tip's height (`getChainInfo`, §6).
    pub fn chain_height(&self, idx: ChainIndex) -> u64 {
        let tip = self.tree(idx).get_best_tip();
        self.tree(idx).get_height(&tip)
    }

    pub fn is_before(&self, idx: ChainIndex, a: &Hash, b: &Hash) -> bool {
        self.tree(idx).is_before(a, b)
    }

    /// Sum of the weight of every chosen tip.
    pub fn cal_weight(&self, deps: &[(ChainIndex, Hash)]) -> U256 {
        deps.iter().fold(U256::zero(), |acc, (idx, hash)| acc.saturating_add(self.tree(*idx).get_weight(hash)))
    }

    /// Appends `block` to its chain's tree and reports whether it changed
    /// that chain's tips.
    pub fn add_and_update_view(&mut self, idx: ChainIndex, block: Block, weight: U256) -> Result<AddResult> {
        let result = self.tree_mut(idx).add(block, weight);
        match &result {
            AddResult::MissingDeps(h) => Err(Error::MissingDeps(vec![*h])),
            _ => Ok(result),
        }
    }

    /// Selects the `2G-1` dependency hashes for chain `own`: `own`'s own
    /// best tip, plus for every other chain the highest-weight tip whose
    /// inclusion keeps every chosen dep's implied history mutually
    /// consistent (§4.3 conflict rule), scanned greedily in descending
    /// weight order.
    pub fn best_deps(&self, own: ChainIndex) -> Vec<(ChainIndex, Hash)> {
        let mut chosen: Vec<(ChainIndex, Hash)> = vec![(own, self.tree(own).get_best_tip())];
        let mut other_indices: Vec<ChainIndex> = (0..self.group_num)
            .flat_map(|from| (0..self.group_num).map(move |to| ChainIndex::new(from, to)))
            .filter(|idx| *idx != own)
            .collect();
        other_indices.sort();

        let mut candidates: Vec<(ChainIndex, Hash, U256)> = other_indices
            .into_iter()
            .map(|idx| {
                let tip = self.tree(idx).get_best_tip();
                let weight = self.tree(idx).get_weight(&tip);
                (idx, tip, weight)
            })
            .collect();
        candidates.sort_by(|a, b| b.2.cmp(&a.2));

        for (idx, tip, _weight) in candidates {
            if self.is_consistent_with(&chosen, idx, &tip) {
                chosen.push((idx, tip));
            } else {
                let fallback = self.latest_consistent_ancestor(&chosen, idx, &tip);
                chosen.push((idx, fallback));
            }
        }
        chosen
    }

    /// A candidate `(idx, hash)` is consistent with `chosen` iff, for every
    /// already-chosen `(other_idx, other_hash)` on the same chain, one is an
    /// ancestor of the other (no contradicting branch is implied).
    fn is_consistent_with(&self, chosen: &[(ChainIndex, Hash)], idx: ChainIndex, hash: &Hash) -> bool {
        chosen.iter().filter(|(i, _)| *i == idx).all(|(_, h)| {
            let tree = self.tree(idx);
            tree.is_before(h, hash) || tree.is_before(hash, h)
        })
    }

    /// Walks `hash` toward the root of its chain until it is consistent with
    /// `chosen`; always terminates at the chain's genesis, which is an
    /// ancestor of everything.
    fn latest_consistent_ancestor(&self, chosen: &[(ChainIndex, Hash)], idx: ChainIndex, hash: &Hash) -> Hash {
        let tree = self.tree(idx);
        let slice = tree.get_block_slice(hash);
        slice
            .into_iter()
            .rev()
            .find(|candidate| self.is_consistent_with(chosen, idx, candidate))
            .unwrap_or_else(|| tree.get_block_slice(hash).into_iter().next().expect("chain slice always has genesis"))
    }

    /// Assembles a block template for `own`: `bestDeps`, a coinbase paying
    /// `block_reward` plus collected fees to `miner_lockup`, and as many
    /// mempool candidates (gas-price order) as fit under `block_gas_limit`
    /// without reusing an already-selected input (§4.3). `world` supplies the
    /// post-state commitment that becomes the header's `depStateHash`; the
    /// caller is responsible for re-validating against a possibly-moved tip
    /// before mining the nonce, hence "unsafe".
    pub fn prepare_block_flow_unsafe(
        &self,
        own: ChainIndex,
        miner_lockup: Address,
        mempool: &Mempool,
        world: &WorldState,
        block_gas_limit: u64,
        block_reward: U256,
        coinbase_lock_time: u64,
    ) -> Result<BlockTemplate> {
        let block_deps = self.best_deps(own).into_iter().map(|(_, hash)| hash).collect();

        let mut spent: HashSet<OutputRef> = HashSet::new();
        let mut gas_used: u64 = 0;
        let mut total_fees = U256::zero();
        let mut selected = Vec::new();
        for entry in mempool.ordered_candidates() {
            let tx = &entry.tx;
            if tx.unsigned.inputs.iter().any(|input| spent.contains(&input.output_ref)) {
                continue;
            }
            let gas = tx.unsigned.gas_amount;
            if gas_used.saturating_add(gas) > block_gas_limit {
                continue;
            }
            gas_used += gas;
            total_fees = total_fees.saturating_add(tx.unsigned.gas_fee());
            spent.extend(tx.unsigned.inputs.iter().map(|input| input.output_ref));
            selected.push(tx.clone());
        }

        let coinbase = Transaction::coinbase(block_reward.saturating_add(total_fees), miner_lockup, coinbase_lock_time);
        let mut transactions = Vec::with_capacity(selected.len() + 1);
        transactions.push(coinbase);
        transactions.extend(selected);

        let dep_state_hash = world.commitment()?;
        Ok(BlockTemplate { block_deps, transactions, dep_state_hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::BlockHeader;
    use crate::primitives::Target;

    fn genesis_for(idx: ChainIndex) -> Block {
        let header = BlockHeader {
            block_deps: vec![],
            dep_state_hash: Hash::ZERO,
            txs_hash: Block::compute_txs_hash(&[]),
            timestamp: 0,
            target: Target::GENESIS,
            nonce: [idx.from as u8, idx.to as u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            version: 0,
        };
        Block { header, transactions: vec![] }
    }

    #[test]
    fn seeds_every_chain_in_the_grid() {
        let flow = BlockFlow::new(2, 10, genesis_for);
        assert_eq!(flow.trees.len(), 4);
    }

    #[test]
    fn best_deps_includes_own_best_tip_first() {
        let flow = BlockFlow::new(2, 10, genesis_for);
        let own = ChainIndex::new(0, 0);
        let deps = flow.best_deps(own);
        assert_eq!(deps[0].0, own);
        assert_eq!(deps.len(), 4);
    }

    #[test]
    fn cal_weight_sums_chosen_tips() {
        let flow = BlockFlow::new(2, 10, genesis_for);
        let own = ChainIndex::new(0, 0);
        let deps = flow.best_deps(own);
        assert_eq!(flow.cal_weight(&deps), U256::from(4u64));
    }

    #[test]
    fn template_pays_coinbase_and_respects_gas_limit() {
        use crate::primitives::Hash as H;

        let flow = BlockFlow::new(2, 10, genesis_for);
        let own = ChainIndex::new(0, 0);
        let world = WorldState::new();
        let mut mempool = Mempool::new(60_000);

        let mut cheap = Transaction::coinbase(U256::from(1u64), Address::P2PKH(H::blake2b(b"a")), 0);
        cheap.unsigned.inputs = vec![];
        cheap.unsigned.gas_amount = 10;
        mempool.insert(cheap, 0);

        let template = flow
            .prepare_block_flow_unsafe(own, Address::P2PKH(H::blake2b(b"miner")), &mempool, &world, 1_000, U256::from(100u64), 0)
            .unwrap();

        assert!(template.transactions[0].is_coinbase());
        assert_eq!(template.block_deps.len(), 4);
    }
}
