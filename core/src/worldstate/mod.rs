//! World state (§4.5): the UTXO set, contract storage and event log that
//! block validation and the VM read and mutate, committed via [`trie`].

pub mod trie;

use crate::chain::{ContractState, LogStates, OutputRef, TxOutput};
use crate::codec;
use crate::error::Result;
use crate::primitives::{Address, Hash};
use crate::storage::Cache;

/// The three Merkleized tables §4.5 names, each a [`Cache`] over its own
/// logical key space.
#[derive(Default)]
pub struct WorldState {
    outputs: Cache<OutputRef, TxOutput>,
    contracts: Cache<Hash, ContractState>,
    log_states: Cache<Hash, LogStates>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_output(&self, output_ref: &OutputRef) -> Option<&TxOutput> {
        self.outputs.get(output_ref)
    }

    pub fn output_exists(&self, output_ref: &OutputRef) -> bool {
        self.outputs.contains(output_ref)
    }

    pub fn create_output(&mut self, output_ref: OutputRef, output: TxOutput) {
        self.outputs.put(output_ref, output);
    }

    /// Consumes the UTXO at `output_ref`. Callers must have checked
    /// [`WorldState::output_exists`] first; validation rejects a spend of a
    /// missing output before this is called (§4.4 `MissingInput`).
    pub fn spend_output(&mut self, output_ref: &OutputRef) {
        self.outputs.remove(*output_ref);
    }

    pub fn get_contract(&self, contract_id: &Hash) -> Option<&ContractState> {
        self.contracts.get(contract_id)
    }

    pub fn put_contract(&mut self, contract_id: Hash, state: ContractState) {
        self.contracts.put(contract_id, state);
    }

    pub fn destroy_contract(&mut self, contract_id: &Hash) {
        self.contracts.remove(*contract_id);
    }

    pub fn get_log_states(&self, log_states_id: &Hash) -> Option<&LogStates> {
        self.log_states.get(log_states_id)
    }

    pub fn put_log_states(&mut self, log_states_id: Hash, states: LogStates) {
        self.log_states.put(log_states_id, states);
    }

    /// Every live UTXO locked to `address`, for `getBalance` (§6).
    pub fn outputs_owned_by<'a>(&'a self, address: &'a Address) -> impl Iterator<Item = (&'a OutputRef, &'a TxOutput)> {
        self.outputs.iter_live().filter(move |(_, out)| out.lockup_script() == address)
    }

    /// `depStateHash`: the root committing to every live output, contract
    /// and log-states entry. Two nodes computing this divergently disagree
    /// on state (§4.5).
    pub fn commitment(&self) -> Result<Hash> {
        let mut output_entries = Vec::new();
        for (key, value) in self.outputs.iter_live() {
            output_entries.push((codec::encode(key)?, Hash::keccak(&codec::encode(value)?)));
        }
        let mut contract_entries = Vec::new();
        for (key, value) in self.contracts.iter_live() {
            contract_entries.push((codec::encode(key)?, Hash::keccak(&codec::encode(value)?)));
        }
        let mut log_entries = Vec::new();
        for (key, value) in self.log_states.iter_live() {
            log_entries.push((codec::encode(key)?, Hash::keccak(&codec::encode(value)?)));
        }
        let outputs_root = trie::root_hash(output_entries);
        let contracts_root = trie::root_hash(contract_entries);
        let logs_root = trie::root_hash(log_entries);
        Ok(Hash::combine(&Hash::combine(&outputs_root, &contracts_root), &logs_root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::AssetOutput;
    use crate::primitives::Address;

    fn sample_output_ref(tag: u8) -> OutputRef {
        OutputRef::new(0, Hash::blake2b(&[tag]))
    }

    fn sample_output(amount: u64) -> TxOutput {
        TxOutput::Asset(AssetOutput {
            amount: primitive_types::U256::from(amount),
            lockup_script: Address::P2PKH(Hash::blake2b(b"owner")),
            tokens: vec![],
            lock_time: 0,
            message: vec![],
        })
    }

    #[test]
    fn create_then_get_round_trips() {
        let mut ws = WorldState::new();
        let out_ref = sample_output_ref(1);
        ws.create_output(out_ref, sample_output(10));
        assert!(ws.output_exists(&out_ref));
    }

    #[test]
    fn spend_removes_output() {
        let mut ws = WorldState::new();
        let out_ref = sample_output_ref(1);
        ws.create_output(out_ref, sample_output(10));
        ws.spend_output(&out_ref);
        assert!(!ws.output_exists(&out_ref));
    }

    #[test]
    fn commitment_changes_with_state() {
        let mut ws = WorldState::new();
        let empty_root = ws.commitment().unwrap();
        ws.create_output(sample_output_ref(1), sample_output(10));
        let nonempty_root = ws.commitment().unwrap();
        assert_ne!(empty_root, nonempty_root);
    }
}
