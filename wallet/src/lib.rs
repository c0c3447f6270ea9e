//! Client-side wallet: keypair generation, address derivation, and
//! transfer-transaction construction/signing consumed by `flowchain-rpc`'s
//! `buildTransferTx`/`submitTx` (§6).

use ed25519_dalek::{Keypair, PublicKey, Signer};
use thiserror::Error;

use flowchain_core::chain::{AssetOutput, OutputRef, Token, Transaction, TxInput, UnsignedTransaction};
use flowchain_core::primitives::{Address, Hash, Signature, U256};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: String, available: String },
    #[error("no destinations supplied")]
    NoDestinations,
}

/// Generates a fresh Ed25519 keypair using the OS RNG. Unlike the teacher
/// crate's zero-secret placeholder, this is safe to use directly.
pub fn generate_keypair() -> Keypair {
    let mut csprng = rand::rngs::OsRng {};
    Keypair::generate(&mut csprng)
}

/// Derives this wallet's `P2PKH` address from its public key: `keccak(pubkey)`,
/// matching the hash family `validation::verify_unlock` checks against.
pub fn address_of(public: &PublicKey) -> Address {
    Address::P2PKH(Hash::keccak(public.as_bytes()))
}

/// One spendable UTXO known to the wallet, as returned by `getBalance`/a
/// UTXO-listing query against the node.
#[derive(Debug, Clone)]
pub struct SpendableUtxo {
    pub output_ref: OutputRef,
    pub amount: U256,
    pub tokens: Vec<Token>,
}

/// Greedily selects UTXOs (largest-amount first) until their sum covers
/// `target`, returning the selected set and any excess as change.
pub fn select_coins(mut available: Vec<SpendableUtxo>, target: U256) -> Result<(Vec<SpendableUtxo>, U256), WalletError> {
    available.sort_by(|a, b| b.amount.cmp(&a.amount));
    let mut selected = Vec::new();
    let mut total = U256::zero();
    for utxo in available {
        if total >= target {
            break;
        }
        total = total + utxo.amount;
        selected.push(utxo);
    }
    if total < target {
        return Err(WalletError::InsufficientFunds { needed: target.to_string(), available: total.to_string() });
    }
    Ok((selected, total - target))
}

/// Gas parameters a caller supplies to `buildTransferTx` (§6 `gasOpts`).
#[derive(Debug, Clone, Copy)]
pub struct GasOpts {
    pub gas_amount: u64,
    pub gas_price: U256,
}

/// Builds an unsigned transfer transaction spending `inputs` to pay
/// `destinations`, returning any unspent amount to `change_address`.
pub fn build_transfer_tx(
    inputs: Vec<SpendableUtxo>,
    destinations: Vec<(Address, U256)>,
    gas: GasOpts,
    change_address: Address,
) -> Result<UnsignedTransaction, WalletError> {
    if destinations.is_empty() {
        return Err(WalletError::NoDestinations);
    }
    let input_total: U256 = inputs.iter().fold(U256::zero(), |acc, u| acc + u.amount);
    let dest_total: U256 = destinations.iter().fold(U256::zero(), |acc, (_, amount)| acc + amount);
    let fee = U256::from(gas.gas_amount) * gas.gas_price;
    let needed = dest_total + fee;
    if input_total < needed {
        return Err(WalletError::InsufficientFunds { needed: needed.to_string(), available: input_total.to_string() });
    }
    let change = input_total - needed;

    let tx_inputs: Vec<TxInput> =
        inputs.into_iter().map(|u| TxInput { output_ref: u.output_ref, unlock_script: Vec::new() }).collect();

    let mut fixed_outputs: Vec<AssetOutput> = destinations
        .into_iter()
        .map(|(lockup_script, amount)| AssetOutput { amount, lockup_script, tokens: vec![], lock_time: 0, message: vec![] })
        .collect();
    if !change.is_zero() {
        fixed_outputs.push(AssetOutput { amount: change, lockup_script: change_address, tokens: vec![], lock_time: 0, message: vec![] });
    }

    Ok(UnsignedTransaction {
        version: 0,
        network_id: 0,
        script_opt: None,
        gas_amount: gas.gas_amount,
        gas_price: gas.gas_price,
        inputs: tx_inputs,
        fixed_outputs,
    })
}

/// Signs every input with `keypair` (single-owner wallet: every input is
/// assumed to be controlled by the same key) and attaches the raw public key
/// bytes as each input's unlock script, completing the `P2PKH` unlock.
pub fn sign_transaction(mut unsigned: UnsignedTransaction, keypair: &Keypair) -> Transaction {
    let message = unsigned.hash();
    let pubkey_bytes = keypair.public.as_bytes().to_vec();
    for input in unsigned.inputs.iter_mut() {
        input.unlock_script = pubkey_bytes.clone();
    }
    let signature = Signature(keypair.sign(message.as_bytes()).to_bytes());
    let input_signatures = vec![signature; unsigned.inputs.len()];
    Transaction {
        unsigned,
        script_execution_ok: true,
        contract_inputs: vec![],
        generated_outputs: vec![],
        input_signatures,
        script_signatures: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SecretKey;

    fn deterministic_keypair() -> Keypair {
        let secret = SecretKey::from_bytes(&[3u8; 32]).unwrap();
        let public = PublicKey::from(&secret);
        Keypair { secret, public }
    }

    fn utxo(amount: u64) -> SpendableUtxo {
        SpendableUtxo { output_ref: OutputRef::new(0, Hash::blake2b(&amount.to_le_bytes())), amount: U256::from(amount), tokens: vec![] }
    }

    #[test]
    fn select_coins_covers_target_with_change() {
        let (selected, change) = select_coins(vec![utxo(10), utxo(5)], U256::from(8u64)).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(change, U256::from(2u64));
    }

    #[test]
    fn select_coins_fails_when_insufficient() {
        let result = select_coins(vec![utxo(1)], U256::from(10u64));
        assert!(result.is_err());
    }

    #[test]
    fn build_transfer_tx_adds_change_output() {
        let destinations = vec![(Address::P2PKH(Hash::blake2b(b"dest")), U256::from(5u64))];
        let gas = GasOpts { gas_amount: 1, gas_price: U256::one() };
        let unsigned =
            build_transfer_tx(vec![utxo(10)], destinations, gas, Address::P2PKH(Hash::blake2b(b"change"))).unwrap();
        assert_eq!(unsigned.fixed_outputs.len(), 2);
    }

    #[test]
    fn sign_transaction_fills_unlock_scripts_and_signatures() {
        let kp = deterministic_keypair();
        let destinations = vec![(Address::P2PKH(Hash::blake2b(b"dest")), U256::from(5u64))];
        let gas = GasOpts { gas_amount: 0, gas_price: U256::zero() };
        let unsigned = build_transfer_tx(vec![utxo(10)], destinations, gas, address_of(&kp.public)).unwrap();
        let tx = sign_transaction(unsigned, &kp);
        assert_eq!(tx.input_signatures.len(), tx.unsigned.inputs.len());
        assert_eq!(tx.unsigned.inputs[0].unlock_script, kp.public.as_bytes().to_vec());
    }
}
