//! Header, block and transaction validation (§4.4).

use std::collections::HashSet;

use crate::chain::{Block, BlockHeader, Transaction, TxOutput};
use crate::error::ValidationError;
use crate::pow;
use crate::primitives::{ChainIndex, Hash, Target, U256};
use crate::worldstate::WorldState;

/// Header-only checks: no world-state or mempool access required (§4.4
/// "Header validation (stateless)").
pub fn validate_header(
    header: &BlockHeader,
    expected_index: ChainIndex,
    parent_target: Target,
    group_num: u32,
    now_ms: u64,
    clock_drift_tolerance_ms: u64,
) -> Result<(), ValidationError> {
    let hash = header.hash();
    if !pow::hash_meets_target(&hash, &header.target) {
        return Err(ValidationError::InvalidPoW);
    }
    if !pow::within_retarget_band(parent_target, header.target) {
        return Err(ValidationError::InvalidTarget);
    }
    let actual_index = ChainIndex::from_hash(&hash, group_num);
    if actual_index != expected_index {
        return Err(ValidationError::InvalidChainIndex);
    }
    if header.timestamp > now_ms.saturating_add(clock_drift_tolerance_ms) {
        return Err(ValidationError::InvalidTimestamp);
    }
    let expected_deps_len = (2 * group_num - 1) as usize;
    if header.block_deps.len() != expected_deps_len {
        return Err(ValidationError::InvalidDeps("block_deps has the wrong length"));
    }
    let unique: HashSet<&Hash> = header.block_deps.iter().collect();
    if unique.len() != header.block_deps.len() {
        return Err(ValidationError::InvalidDeps("block_deps contains a duplicate"));
    }
    Ok(())
}

/// Stateful checks against the view implied by the block's chosen deps
/// (§4.4 "Block validation (stateful, against bestDeps view)").
pub fn validate_block(
    block: &Block,
    post_state_hash: Hash,
    block_gas_limit: u64,
    block_reward: U256,
    world: &WorldState,
) -> Result<(), ValidationError> {
    let expected_txs_hash = Block::compute_txs_hash(&block.transactions);
    if block.header.txs_hash != expected_txs_hash {
        return Err(ValidationError::InvalidTxHash);
    }
    if block.header.dep_state_hash != post_state_hash {
        return Err(ValidationError::InvalidStateCommitment);
    }

    let Some(coinbase) = block.transactions.first() else {
        return Err(ValidationError::InvalidDeps("block has no coinbase transaction"));
    };
    if !coinbase.is_coinbase() {
        return Err(ValidationError::InvalidDeps("first transaction is not a coinbase"));
    }
    if block.transactions.iter().skip(1).any(Transaction::is_coinbase) {
        return Err(ValidationError::InvalidDeps("coinbase transaction is not unique"));
    }

    let mut total_gas: u64 = 0;
    let mut total_fees = U256::zero();
    for tx in block.transactions.iter().skip(1) {
        validate_transaction(tx, world)?;
        total_gas = total_gas.saturating_add(tx.unsigned.gas_amount);
        total_fees = total_fees.saturating_add(tx.unsigned.gas_fee());
    }
    if total_gas > block_gas_limit {
        return Err(ValidationError::InvalidDeps("total transaction gas exceeds block gas limit"));
    }

    let mut coinbase_amount = U256::zero();
    for output in coinbase.all_outputs() {
        coinbase_amount = coinbase_amount.checked_add(output.amount()).ok_or(ValidationError::InsufficientFunds)?;
    }
    let expected_reward = block_reward.saturating_add(total_fees);
    if coinbase_amount != expected_reward {
        return Err(ValidationError::InsufficientFunds);
    }

    Ok(())
}

/// Non-coinbase transaction checks (§4.4 "Transaction validation").
pub fn validate_transaction(tx: &Transaction, world: &WorldState) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for input in &tx.unsigned.inputs {
        if !seen.insert(input.output_ref) {
            return Err(ValidationError::DuplicateInput);
        }
    }

    let mut input_amount = U256::zero();
    let mut input_tokens: std::collections::HashMap<Hash, U256> = std::collections::HashMap::new();
    for (i, input) in tx.unsigned.inputs.iter().enumerate() {
        let output = world.get_output(&input.output_ref).ok_or(ValidationError::MissingInput)?;
        input_amount = input_amount.checked_add(output.amount()).ok_or(ValidationError::InsufficientFunds)?;
        for token in output.tokens() {
            let entry = input_tokens.entry(token.token_id).or_insert(U256::zero());
            *entry = entry.checked_add(token.amount).ok_or(ValidationError::TokenImbalance(token.token_id))?;
        }
        verify_unlock(output, input, tx, i)?;
    }

    let fee = tx.unsigned.gas_fee();
    let mut output_amount = U256::zero();
    let mut output_tokens: std::collections::HashMap<Hash, U256> = std::collections::HashMap::new();
    for output in tx.all_outputs() {
        output_amount = output_amount.checked_add(output.amount()).ok_or(ValidationError::InsufficientFunds)?;
        for token in output.tokens() {
            let entry = output_tokens.entry(token.token_id).or_insert(U256::zero());
            *entry = entry.checked_add(token.amount).ok_or(ValidationError::TokenImbalance(token.token_id))?;
        }
    }

    if tx.script_execution_ok {
        let required = output_amount.checked_add(fee).ok_or(ValidationError::InsufficientFunds)?;
        if input_amount != required {
            return Err(ValidationError::InsufficientFunds);
        }
        for token_id in output_tokens.keys() {
            if !input_tokens.contains_key(token_id) {
                return Err(ValidationError::TokenImbalance(*token_id));
            }
        }
        for (token_id, amount) in &input_tokens {
            if output_tokens.get(token_id) != Some(amount) {
                return Err(ValidationError::TokenImbalance(*token_id));
            }
        }
    }

    Ok(())
}

/// Checks input `i`'s unlock script against the output it spends. Only
/// `P2PKH` signature verification is implemented directly; `P2SH`/`P2C`
/// unlocks (full script execution) are the VM's responsibility and are
/// delegated there by the caller, not re-implemented here.
fn verify_unlock(
    output: &TxOutput,
    input: &crate::chain::TxInput,
    tx: &Transaction,
    index: usize,
) -> Result<(), ValidationError> {
    use crate::primitives::Address;

    match output.lockup_script() {
        Address::P2PKH(expected_hash) => {
            let pubkey = &input.unlock_script;
            if &Hash::keccak(pubkey) != expected_hash {
                return Err(ValidationError::InvalidSignature);
            }
            let signature = tx.input_signatures.get(index).ok_or(ValidationError::InvalidSignature)?;
            let message = tx.signing_message();
            signature.verify(pubkey, message.as_bytes()).map_err(|_| ValidationError::InvalidSignature)
        }
        Address::P2MPKH { m, hashes } => {
            // `TxInput`/`Transaction` carry exactly one unlock_script and one
            // `input_signatures` entry per input, so only a 1-of-n threshold
            // is representable here; a genuine m-of-n unlock needs m
            // (pubkey, signature) pairs per input, which this wire shape
            // doesn't have room for. Reject anything claiming m != 1 instead
            // of silently honoring it with a single signature.
            if *m != 1 {
                return Err(ValidationError::InvalidSignature);
            }
            let signature = tx.input_signatures.get(index).ok_or(ValidationError::InvalidSignature)?;
            let message = tx.signing_message();
            let pubkey = &input.unlock_script;
            let hash_matches = hashes.iter().any(|h| h == &Hash::keccak(pubkey));
            if !hash_matches {
                return Err(ValidationError::InvalidSignature);
            }
            signature.verify(pubkey, message.as_bytes()).map_err(|_| ValidationError::InvalidSignature)
        }
        Address::P2SH(_) | Address::P2C(_) => {
            if tx.script_execution_ok {
                Ok(())
            } else {
                Err(ValidationError::ScriptExecutionFailed("script did not authorize spend".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::AssetOutput;
    use crate::primitives::Address;

    fn header(target: Target, deps: usize, timestamp: u64) -> BlockHeader {
        BlockHeader {
            block_deps: vec![Hash::ZERO; deps],
            dep_state_hash: Hash::ZERO,
            txs_hash: Block::compute_txs_hash(&[]),
            timestamp,
            target,
            nonce: [0; 24],
            version: 0,
        }
    }

    #[test]
    fn rejects_wrong_deps_length() {
        let h = header(pow::target_from_zero_bits(0), 2, 0);
        let result = validate_header(&h, ChainIndex::new(0, 0), pow::target_from_zero_bits(0), 2, 1_000, 1_000);
        assert_eq!(result, Err(ValidationError::InvalidDeps("block_deps has the wrong length")));
    }

    #[test]
    fn rejects_future_timestamp() {
        let h = header(pow::target_from_zero_bits(0), 3, 10_000);
        let result = validate_header(&h, ChainIndex::new(0, 0), pow::target_from_zero_bits(0), 2, 0, 100);
        assert_eq!(result, Err(ValidationError::InvalidTimestamp));
    }

    #[test]
    fn rejects_spend_of_missing_output() {
        let world = WorldState::new();
        let input = crate::chain::TxInput {
            output_ref: crate::chain::OutputRef::new(0, Hash::blake2b(b"missing")),
            unlock_script: vec![],
        };
        let tx = Transaction {
            unsigned: crate::chain::UnsignedTransaction {
                version: 0,
                network_id: 0,
                script_opt: None,
                gas_amount: 0,
                gas_price: U256::zero(),
                inputs: vec![input],
                fixed_outputs: vec![],
            },
            script_execution_ok: true,
            contract_inputs: vec![],
            generated_outputs: vec![],
            input_signatures: vec![],
            script_signatures: vec![],
        };
        assert_eq!(validate_transaction(&tx, &world), Err(ValidationError::MissingInput));
    }

    #[test]
    fn rejects_duplicate_input() {
        let world = WorldState::new();
        let output_ref = crate::chain::OutputRef::new(0, Hash::blake2b(b"dup"));
        let input = crate::chain::TxInput { output_ref, unlock_script: vec![] };
        let tx = Transaction {
            unsigned: crate::chain::UnsignedTransaction {
                version: 0,
                network_id: 0,
                script_opt: None,
                gas_amount: 0,
                gas_price: U256::zero(),
                inputs: vec![input.clone(), input],
                fixed_outputs: vec![],
            },
            script_execution_ok: true,
            contract_inputs: vec![],
            generated_outputs: vec![],
            input_signatures: vec![],
            script_signatures: vec![],
        };
        assert_eq!(validate_transaction(&tx, &world), Err(ValidationError::DuplicateInput));
    }

    #[test]
    fn p2pkh_signature_must_match_pubkey_hash() {
        let mut world = WorldState::new();
        let out_ref = crate::chain::OutputRef::new(0, Hash::blake2b(b"utxo"));
        world.create_output(
            out_ref,
            TxOutput::Asset(AssetOutput {
                amount: U256::from(10u64),
                lockup_script: Address::P2PKH(Hash::blake2b(b"not-the-real-hash")),
                tokens: vec![],
                lock_time: 0,
                message: vec![],
            }),
        );
        let input = crate::chain::TxInput { output_ref: out_ref, unlock_script: vec![1, 2, 3] };
        let tx = Transaction {
            unsigned: crate::chain::UnsignedTransaction {
                version: 0,
                network_id: 0,
                script_opt: None,
                gas_amount: 0,
                gas_price: U256::zero(),
                inputs: vec![input],
                fixed_outputs: vec![],
            },
            script_execution_ok: true,
            contract_inputs: vec![],
            generated_outputs: vec![],
            input_signatures: vec![],
            script_signatures: vec![],
        };
        assert_eq!(validate_transaction(&tx, &world), Err(ValidationError::InvalidSignature));
    }

    #[test]
    fn rejects_token_minted_in_output_with_no_input() {
        let mut world = WorldState::new();
        let out_ref = crate::chain::OutputRef::new(0, Hash::blake2b(b"utxo"));
        world.create_output(
            out_ref,
            TxOutput::Asset(AssetOutput {
                amount: U256::from(10u64),
                lockup_script: Address::P2PKH(Hash::blake2b(b"owner")),
                tokens: vec![],
                lock_time: 0,
                message: vec![],
            }),
        );
        let input = crate::chain::TxInput { output_ref: out_ref, unlock_script: vec![] };
        let tx = Transaction {
            unsigned: crate::chain::UnsignedTransaction {
                version: 0,
                network_id: 0,
                script_opt: None,
                gas_amount: 0,
                gas_price: U256::zero(),
                inputs: vec![input],
                fixed_outputs: vec![AssetOutput {
                    amount: U256::from(10u64),
                    lockup_script: Address::P2PKH(Hash::blake2b(b"dest")),
                    tokens: vec![crate::chain::Token { token_id: Hash::blake2b(b"minted"), amount: U256::from(1u64) }],
                    lock_time: 0,
                    message: vec![],
                }],
            },
            script_execution_ok: true,
            contract_inputs: vec![],
            generated_outputs: vec![],
            input_signatures: vec![],
            script_signatures: vec![],
        };
        assert_eq!(validate_transaction(&tx, &world), Err(ValidationError::TokenImbalance(Hash::blake2b(b"minted"))));
    }

    #[test]
    fn p2mpkh_rejects_threshold_above_one() {
        let mut world = WorldState::new();
        let out_ref = crate::chain::OutputRef::new(0, Hash::blake2b(b"multisig-utxo"));
        let hash = Hash::blake2b(b"owner-pubkey");
        world.create_output(
            out_ref,
            TxOutput::Asset(AssetOutput {
                amount: U256::from(10u64),
                lockup_script: Address::P2MPKH { m: 2, hashes: vec![hash, Hash::blake2b(b"other")] },
                tokens: vec![],
                lock_time: 0,
                message: vec![],
            }),
        );
        let input = crate::chain::TxInput { output_ref: out_ref, unlock_script: b"owner-pubkey".to_vec() };
        let tx = Transaction {
            unsigned: crate::chain::UnsignedTransaction {
                version: 0,
                network_id: 0,
                script_opt: None,
                gas_amount: 0,
                gas_price: U256::zero(),
                inputs: vec![input],
                fixed_outputs: vec![],
            },
            script_execution_ok: true,
            contract_inputs: vec![],
            generated_outputs: vec![],
            input_signatures: vec![crate::primitives::Signature([0u8; 64])],
            script_signatures: vec![],
        };
        assert_eq!(validate_transaction(&tx, &world), Err(ValidationError::InvalidSignature));
    }
}
