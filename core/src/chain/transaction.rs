//! Transaction, its inputs/outputs, and the `OutputRef` that ties a spend
//! back to the UTXO it consumes (§3 Transaction, OutputRef, TxOutput).

use serde::{Deserialize, Serialize};

use crate::primitives::{Address, Hash, Signature};

/// `{hint, key}`: `hint` encodes the destination script group for fast
/// routing, `key` identifies the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    pub hint: i32,
    pub key: Hash,
}

impl OutputRef {
    pub fn new(hint: i32, key: Hash) -> Self {
        OutputRef { hint, key }
    }
}

/// One fungible or non-fungible token carried by an output alongside its
/// native-asset amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_id: Hash,
    pub amount: primitive_types::U256,
}

/// An ordinary value-transfer output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetOutput {
    pub amount: primitive_types::U256,
    pub lockup_script: Address,
    pub tokens: Vec<Token>,
    /// Earliest millisecond timestamp at which this output becomes spendable.
    pub lock_time: u64,
    pub message: Vec<u8>,
}

/// An output that creates or funds a contract instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractOutput {
    pub amount: primitive_types::U256,
    /// Always a `Address::P2C` lockup.
    pub lockup_script: Address,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutput {
    Asset(AssetOutput),
    Contract(ContractOutput),
}

impl TxOutput {
    pub fn amount(&self) -> primitive_types::U256 {
        match self {
            TxOutput::Asset(o) => o.amount,
            TxOutput::Contract(o) => o.amount,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        match self {
            TxOutput::Asset(o) => &o.tokens,
            TxOutput::Contract(o) => &o.tokens,
        }
    }

    pub fn lockup_script(&self) -> &Address {
        match self {
            TxOutput::Asset(o) => &o.lockup_script,
            TxOutput::Contract(o) => &o.lockup_script,
        }
    }

    pub fn is_contract(&self) -> bool {
        matches!(self, TxOutput::Contract(_))
    }
}

/// One spend: the output it consumes, plus the script that unlocks it.
/// `unlock_script` is either raw signature-check bytes (P2PKH/P2MPKH) or a
/// full script for P2SH/P2C, distinguished at validation time by the
/// referenced output's lockup kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub output_ref: OutputRef,
    pub unlock_script: Vec<u8>,
}

/// Compiled contract bytecode attached to a transaction for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub bytecode: Vec<u8>,
}

/// The signable portion of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub version: u8,
    pub network_id: u8,
    pub script_opt: Option<Script>,
    pub gas_amount: u64,
    pub gas_price: primitive_types::U256,
    pub inputs: Vec<TxInput>,
    pub fixed_outputs: Vec<AssetOutput>,
}

impl UnsignedTransaction {
    /// Identity hash: Keccak family, per the trie/tx hash-domain split
    /// (SPEC_FULL.md §9 resolved open question).
    pub fn hash(&self) -> Hash {
        let encoded = crate::codec::encode(self).expect("unsigned tx encodes");
        Hash::keccak(&encoded)
    }

    pub fn gas_fee(&self) -> primitive_types::U256 {
        primitive_types::U256::from(self.gas_amount) * self.gas_price
    }
}

/// A full transaction: the signable part plus the outcome of any attached
/// script execution and the signatures authorizing every input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub unsigned: UnsignedTransaction,
    pub script_execution_ok: bool,
    pub contract_inputs: Vec<OutputRef>,
    pub generated_outputs: Vec<TxOutput>,
    pub input_signatures: Vec<Signature>,
    pub script_signatures: Vec<Signature>,
}

impl Transaction {
    pub fn hash(&self) -> Hash {
        self.unsigned.hash()
    }

    pub fn is_coinbase(&self) -> bool {
        self.unsigned.inputs.is_empty() && self.contract_inputs.is_empty()
    }

    /// All outputs this transaction produces: its fixed outputs plus
    /// whatever script execution generated.
    pub fn all_outputs(&self) -> Vec<TxOutput> {
        let mut outputs: Vec<TxOutput> =
            self.unsigned.fixed_outputs.iter().cloned().map(TxOutput::Asset).collect();
        outputs.extend(self.generated_outputs.iter().cloned());
        outputs
    }

    /// Builds an unsigned, script-free coinbase transaction paying `reward`
    /// to `miner_lockup`. Used by `prepareBlockFlowUnsafe` (§4.3).
    pub fn coinbase(reward: primitive_types::U256, miner_lockup: Address, lock_time: u64) -> Self {
        Transaction {
            unsigned: UnsignedTransaction {
                version: 0,
                network_id: 0,
                script_opt: None,
                gas_amount: 0,
                gas_price: primitive_types::U256::zero(),
                inputs: Vec::new(),
                fixed_outputs: vec![AssetOutput {
                    amount: reward,
                    lockup_script: miner_lockup,
                    tokens: Vec::new(),
                    lock_time,
                    message: Vec::new(),
                }],
            },
            script_execution_ok: true,
            contract_inputs: Vec::new(),
            generated_outputs: Vec::new(),
            input_signatures: Vec::new(),
            script_signatures: Vec::new(),
        }
    }

    /// The deterministic message every input signature signs: the hash of
    /// the unsigned transaction (signatures are carried alongside, never
    /// inside, the signed payload — matching the teacher crate's
    /// `tx_message` zero-then-hash approach, simplified since signatures
    /// already live outside `unsigned`).
    pub fn signing_message(&self) -> Hash {
        self.unsigned.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_output() -> AssetOutput {
        AssetOutput {
            amount: primitive_types::U256::from(100u64),
            lockup_script: Address::P2PKH(Hash::blake2b(b"owner")),
            tokens: vec![],
            lock_time: 0,
            message: vec![],
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let unsigned = UnsignedTransaction {
            version: 0,
            network_id: 0,
            script_opt: None,
            gas_amount: 1,
            gas_price: primitive_types::U256::one(),
            inputs: vec![],
            fixed_outputs: vec![sample_output()],
        };
        assert_eq!(unsigned.hash(), unsigned.hash());
    }

    #[test]
    fn coinbase_has_no_inputs() {
        let cb = Transaction::coinbase(
            primitive_types::U256::from(50u64),
            Address::P2PKH(Hash::blake2b(b"miner")),
            0,
        );
        assert!(cb.is_coinbase());
    }

    #[test]
    fn all_outputs_combines_fixed_and_generated() {
        let mut tx = Transaction::coinbase(
            primitive_types::U256::from(1u64),
            Address::P2PKH(Hash::blake2b(b"miner")),
            0,
        );
        tx.generated_outputs.push(TxOutput::Asset(sample_output()));
        assert_eq!(tx.all_outputs().len(), 2);
    }
}
