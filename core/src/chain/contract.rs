//! Contract state and event-log entities the world-state trie holds
//! (§3.1 Entity catalogue, §4.5 World State & VM, §4.6 Event Log).

use serde::{Deserialize, Serialize};

use crate::primitives::{Hash, I256};

/// A contract instance's storage: its code and the current value of every
/// mutable field. `ContractId` is the hash of the creating tx plus output
/// index (§4.5 Contract lifecycle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractState {
    pub contract_id: Hash,
    pub code_hash: Hash,
    pub initial_state_hash: Hash,
    pub fields: Vec<I256>,
}

impl ContractState {
    pub fn new(contract_id: Hash, code_hash: Hash, fields: Vec<I256>) -> Self {
        let initial_state_hash = Self::fields_hash(&fields);
        ContractState { contract_id, code_hash, initial_state_hash, fields }
    }

    fn fields_hash(fields: &[I256]) -> Hash {
        let encoded = crate::codec::encode(&fields.to_vec()).expect("fields encode");
        Hash::keccak(&encoded)
    }
}

/// One emitted event: which tx emitted it, its position within that tx's
/// emissions, and its payload fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogState {
    pub tx_id: Hash,
    pub index: u32,
    pub fields: Vec<I256>,
}

/// All events a single contract has emitted across one block, keyed by
/// `(contractId, counter)` at the storage layer (§4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogStates {
    pub contract_id: Hash,
    pub block_hash: Hash,
    pub states: Vec<LogState>,
}

impl LogStates {
    pub fn new(contract_id: Hash, block_hash: Hash) -> Self {
        LogStates { contract_id, block_hash, states: Vec::new() }
    }

    pub fn push(&mut self, tx_id: Hash, fields: Vec<I256>) {
        let index = self.states.len() as u32;
        self.states.push(LogState { tx_id, index, fields });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_hash_is_deterministic() {
        let a = ContractState::new(Hash::blake2b(b"c"), Hash::blake2b(b"code"), vec![I256::from_i128(1)]);
        let b = ContractState::new(Hash::blake2b(b"c"), Hash::blake2b(b"code"), vec![I256::from_i128(1)]);
        assert_eq!(a.initial_state_hash, b.initial_state_hash);
    }

    #[test]
    fn log_states_append_only_indices() {
        let mut logs = LogStates::new(Hash::blake2b(b"c"), Hash::blake2b(b"block"));
        logs.push(Hash::blake2b(b"tx1"), vec![]);
        logs.push(Hash::blake2b(b"tx2"), vec![]);
        assert_eq!(logs.states[0].index, 0);
        assert_eq!(logs.states[1].index, 1);
    }
}
