//! Canonical on-wire/on-disk serialization (§6 Wire format).
//!
//! Fixed-width primitives are little-endian; arbitrary-precision integers
//! (`U256`/`I256`) are minimal big-endian with a one-byte length prefix;
//! sequences are `u32 length || elements`; tagged unions are `u8 tag || body`.
//! Round-trip (`decode(encode(x)) == x`) is mandatory for every type that
//! implements both traits — this is what lets `Hash::keccak`/`Hash::blake2b`
//! of an encoded value serve as that value's content address.
//!
//! Only consensus-critical types (those whose hash must agree byte-for-byte
//! across nodes: blocks, transactions, outputs, world-state entries) implement
//! this. Everything else (config, RPC payloads, misbehavior records) uses
//! `serde`/JSON or `bincode`, which only need to round-trip, not agree on an
//! exact byte layout with a remote peer.

use std::convert::TryInto;

use thiserror::Error;

use crate::chain::contract::{ContractState, LogState, LogStates};
use crate::chain::transaction::{
    AssetOutput, ContractOutput, OutputRef, Script, Token, Transaction, TxInput, TxOutput,
    UnsignedTransaction,
};
use crate::chain::{Block, BlockHeader};
use crate::primitives::{Address, ChainIndex, Hash, Signature, Target, I256, U256};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("sequence length {0} exceeds sanity bound")]
    LengthTooLarge(u32),
    #[error("unknown tag byte {0}")]
    UnknownTag(u8),
    #[error("trailing bytes after decoding")]
    TrailingBytes,
}

/// Sanity bound on any single decoded sequence length, to keep a corrupt or
/// hostile length prefix from triggering a multi-gigabyte allocation.
const MAX_SEQ_LEN: u32 = 64 * 1024 * 1024;

pub trait Encode {
    fn encode_to(&self, buf: &mut Vec<u8>);
}

pub trait Decode: Sized {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError>;
}

pub fn encode<T: Encode>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    value.encode_to(&mut buf);
    Ok(buf)
}

pub fn decode<T: Decode>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut cursor = bytes;
    let value = T::decode_from(&mut cursor)?;
    if !cursor.is_empty() {
        return Err(CodecError::TrailingBytes);
    }
    Ok(value)
}

fn take<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8], CodecError> {
    if buf.len() < n {
        return Err(CodecError::UnexpectedEof);
    }
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

macro_rules! impl_fixed_le {
    ($ty:ty) => {
        impl Encode for $ty {
            fn encode_to(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }
        }
        impl Decode for $ty {
            fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
                let bytes = take(buf, std::mem::size_of::<$ty>())?;
                Ok(<$ty>::from_le_bytes(bytes.try_into().unwrap()))
            }
        }
    };
}

impl_fixed_le!(u8);
impl_fixed_le!(u16);
impl_fixed_le!(u32);
impl_fixed_le!(u64);
impl_fixed_le!(i32);
impl_fixed_le!(i64);

impl Encode for bool {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.push(if *self { 1 } else { 0 });
    }
}

impl Decode for bool {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(take(buf, 1)?[0] != 0)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        (self.len() as u32).encode_to(buf);
        for item in self {
            item.encode_to(buf);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let len = u32::decode_from(buf)?;
        if len > MAX_SEQ_LEN {
            return Err(CodecError::LengthTooLarge(len));
        }
        let mut out = Vec::with_capacity(len as usize);
        for _ in 0..len {
            out.push(T::decode_from(buf)?);
        }
        Ok(out)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        match self {
            None => buf.push(0),
            Some(v) => {
                buf.push(1);
                v.encode_to(buf);
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        match take(buf, 1)?[0] {
            0 => Ok(None),
            1 => Ok(Some(T::decode_from(buf)?)),
            other => Err(CodecError::UnknownTag(other)),
        }
    }
}

impl Encode for String {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        (self.len() as u32).encode_to(buf);
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Decode for String {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let len = u32::decode_from(buf)?;
        if len > MAX_SEQ_LEN {
            return Err(CodecError::LengthTooLarge(len));
        }
        let bytes = take(buf, len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::UnexpectedEof)
    }
}

/// Byte vectors encode as a raw length-prefixed blob rather than going
/// through the generic `Vec<T>` impl element-by-element.
fn encode_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    (bytes.len() as u32).encode_to(buf);
    buf.extend_from_slice(bytes);
}

fn decode_bytes(buf: &mut &[u8]) -> Result<Vec<u8>, CodecError> {
    let len = u32::decode_from(buf)?;
    if len > MAX_SEQ_LEN {
        return Err(CodecError::LengthTooLarge(len));
    }
    Ok(take(buf, len as usize)?.to_vec())
}

/// Minimal big-endian encoding of an arbitrary-precision integer: a one-byte
/// length followed by that many big-endian bytes with no leading zero byte
/// (zero itself encodes as length 0).
fn encode_minimal_be(full_be: &[u8], buf: &mut Vec<u8>) {
    let first_nonzero = full_be.iter().position(|&b| b != 0).unwrap_or(full_be.len());
    let trimmed = &full_be[first_nonzero..];
    buf.push(trimmed.len() as u8);
    buf.extend_from_slice(trimmed);
}

fn decode_minimal_be(buf: &mut &[u8]) -> Result<Vec<u8>, CodecError> {
    let len = take(buf, 1)?[0] as usize;
    Ok(take(buf, len)?.to_vec())
}

impl Encode for U256 {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        let mut full = [0u8; 32];
        self.to_big_endian(&mut full);
        encode_minimal_be(&full, buf);
    }
}

impl Decode for U256 {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let bytes = decode_minimal_be(buf)?;
        if bytes.len() > 32 {
            return Err(CodecError::LengthTooLarge(bytes.len() as u32));
        }
        let mut full = [0u8; 32];
        full[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(U256::from_big_endian(&full))
    }
}

impl Encode for I256 {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        // I256 is two's complement; canonical form carries the full 32
        // bytes since "minimal" trimming doesn't have an unambiguous meaning
        // for negative values without a sign convention collision.
        let mut le = self.to_le_bytes();
        le.reverse();
        buf.push(32);
        buf.extend_from_slice(&le);
    }
}

impl Decode for I256 {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let len = take(buf, 1)?[0] as usize;
        let bytes = take(buf, len)?;
        let mut arr = [0u8; 32];
        if len > 32 {
            return Err(CodecError::LengthTooLarge(len as u32));
        }
        arr[32 - len..].copy_from_slice(bytes);
        arr.reverse();
        Ok(I256::from_le_bytes(&arr))
    }
}

impl Encode for Hash {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Decode for Hash {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let bytes = take(buf, 32)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Hash::from_bytes(arr))
    }
}

impl Encode for Signature {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0);
    }
}

impl Decode for Signature {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let bytes = take(buf, 64)?;
        Signature::from_bytes(bytes).map_err(|_| CodecError::UnexpectedEof)
    }
}

impl Encode for Target {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.0.encode_to(buf);
    }
}

impl Decode for Target {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Target(u32::decode_from(buf)?))
    }
}

impl Encode for ChainIndex {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.from.encode_to(buf);
        self.to.encode_to(buf);
    }
}

impl Decode for ChainIndex {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let from = u32::decode_from(buf)?;
        let to = u32::decode_from(buf)?;
        Ok(ChainIndex::new(from, to))
    }
}

const ADDR_TAG_P2PKH: u8 = 0;
const ADDR_TAG_P2MPKH: u8 = 1;
const ADDR_TAG_P2SH: u8 = 2;
const ADDR_TAG_P2C: u8 = 3;

impl Encode for Address {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        match self {
            Address::P2PKH(h) => {
                buf.push(ADDR_TAG_P2PKH);
                h.encode_to(buf);
            }
            Address::P2SH(h) => {
                buf.push(ADDR_TAG_P2SH);
                h.encode_to(buf);
            }
            Address::P2C(h) => {
                buf.push(ADDR_TAG_P2C);
                h.encode_to(buf);
            }
            Address::P2MPKH { m, hashes } => {
                buf.push(ADDR_TAG_P2MPKH);
                buf.push(*m);
                hashes.encode_to(buf);
            }
        }
    }
}

impl Decode for Address {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let tag = take(buf, 1)?[0];
        match tag {
            ADDR_TAG_P2PKH => Ok(Address::P2PKH(Hash::decode_from(buf)?)),
            ADDR_TAG_P2SH => Ok(Address::P2SH(Hash::decode_from(buf)?)),
            ADDR_TAG_P2C => Ok(Address::P2C(Hash::decode_from(buf)?)),
            ADDR_TAG_P2MPKH => {
                let m = take(buf, 1)?[0];
                let hashes = Vec::<Hash>::decode_from(buf)?;
                Ok(Address::P2MPKH { m, hashes })
            }
            other => Err(CodecError::UnknownTag(other)),
        }
    }
}

impl Encode for OutputRef {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.hint.encode_to(buf);
        self.key.encode_to(buf);
    }
}

impl Decode for OutputRef {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let hint = i32::decode_from(buf)?;
        let key = Hash::decode_from(buf)?;
        Ok(OutputRef::new(hint, key))
    }
}

impl Encode for Token {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.token_id.encode_to(buf);
        self.amount.encode_to(buf);
    }
}

impl Decode for Token {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Token { token_id: Hash::decode_from(buf)?, amount: U256::decode_from(buf)? })
    }
}

impl Encode for AssetOutput {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.amount.encode_to(buf);
        self.lockup_script.encode_to(buf);
        self.tokens.encode_to(buf);
        self.lock_time.encode_to(buf);
        encode_bytes(&self.message, buf);
    }
}

impl Decode for AssetOutput {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(AssetOutput {
            amount: U256::decode_from(buf)?,
            lockup_script: Address::decode_from(buf)?,
            tokens: Vec::<Token>::decode_from(buf)?,
            lock_time: u64::decode_from(buf)?,
            message: decode_bytes(buf)?,
        })
    }
}

impl Encode for ContractOutput {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.amount.encode_to(buf);
        self.lockup_script.encode_to(buf);
        self.tokens.encode_to(buf);
    }
}

impl Decode for ContractOutput {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(ContractOutput {
            amount: U256::decode_from(buf)?,
            lockup_script: Address::decode_from(buf)?,
            tokens: Vec::<Token>::decode_from(buf)?,
        })
    }
}

const TX_OUTPUT_TAG_ASSET: u8 = 0;
const TX_OUTPUT_TAG_CONTRACT: u8 = 1;

impl Encode for TxOutput {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        match self {
            TxOutput::Asset(o) => {
                buf.push(TX_OUTPUT_TAG_ASSET);
                o.encode_to(buf);
            }
            TxOutput::Contract(o) => {
                buf.push(TX_OUTPUT_TAG_CONTRACT);
                o.encode_to(buf);
            }
        }
    }
}

impl Decode for TxOutput {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        match take(buf, 1)?[0] {
            TX_OUTPUT_TAG_ASSET => Ok(TxOutput::Asset(AssetOutput::decode_from(buf)?)),
            TX_OUTPUT_TAG_CONTRACT => Ok(TxOutput::Contract(ContractOutput::decode_from(buf)?)),
            other => Err(CodecError::UnknownTag(other)),
        }
    }
}

impl Encode for TxInput {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.output_ref.encode_to(buf);
        encode_bytes(&self.unlock_script, buf);
    }
}

impl Decode for TxInput {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(TxInput { output_ref: OutputRef::decode_from(buf)?, unlock_script: decode_bytes(buf)? })
    }
}

impl Encode for Script {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        encode_bytes(&self.bytecode, buf);
    }
}

impl Decode for Script {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Script { bytecode: decode_bytes(buf)? })
    }
}

impl Encode for UnsignedTransaction {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.version.encode_to(buf);
        self.network_id.encode_to(buf);
        self.script_opt.encode_to(buf);
        self.gas_amount.encode_to(buf);
        self.gas_price.encode_to(buf);
        self.inputs.encode_to(buf);
        self.fixed_outputs.encode_to(buf);
    }
}

impl Decode for UnsignedTransaction {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(UnsignedTransaction {
            version: u8::decode_from(buf)?,
            network_id: u8::decode_from(buf)?,
            script_opt: Option::<Script>::decode_from(buf)?,
            gas_amount: u64::decode_from(buf)?,
            gas_price: U256::decode_from(buf)?,
            inputs: Vec::<TxInput>::decode_from(buf)?,
            fixed_outputs: Vec::<AssetOutput>::decode_from(buf)?,
        })
    }
}

impl Encode for Transaction {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.unsigned.encode_to(buf);
        self.script_execution_ok.encode_to(buf);
        self.contract_inputs.encode_to(buf);
        self.generated_outputs.encode_to(buf);
        self.input_signatures.encode_to(buf);
        self.script_signatures.encode_to(buf);
    }
}

impl Decode for Transaction {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Transaction {
            unsigned: UnsignedTransaction::decode_from(buf)?,
            script_execution_ok: bool::decode_from(buf)?,
            contract_inputs: Vec::<OutputRef>::decode_from(buf)?,
            generated_outputs: Vec::<TxOutput>::decode_from(buf)?,
            input_signatures: Vec::<Signature>::decode_from(buf)?,
            script_signatures: Vec::<Signature>::decode_from(buf)?,
        })
    }
}

impl Encode for BlockHeader {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.block_deps.encode_to(buf);
        self.dep_state_hash.encode_to(buf);
        self.txs_hash.encode_to(buf);
        self.timestamp.encode_to(buf);
        self.target.encode_to(buf);
        buf.extend_from_slice(&self.nonce);
        self.version.encode_to(buf);
    }
}

impl Decode for BlockHeader {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        let block_deps = Vec::<Hash>::decode_from(buf)?;
        let dep_state_hash = Hash::decode_from(buf)?;
        let txs_hash = Hash::decode_from(buf)?;
        let timestamp = u64::decode_from(buf)?;
        let target = Target::decode_from(buf)?;
        let nonce_bytes = take(buf, 24)?;
        let mut nonce = [0u8; 24];
        nonce.copy_from_slice(nonce_bytes);
        let version = u8::decode_from(buf)?;
        Ok(BlockHeader { block_deps, dep_state_hash, txs_hash, timestamp, target, nonce, version })
    }
}

impl Encode for Block {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.header.encode_to(buf);
        self.transactions.encode_to(buf);
    }
}

impl Decode for Block {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Block { header: BlockHeader::decode_from(buf)?, transactions: Vec::<Transaction>::decode_from(buf)? })
    }
}

impl Encode for ContractState {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.contract_id.encode_to(buf);
        self.code_hash.encode_to(buf);
        self.initial_state_hash.encode_to(buf);
        self.fields.encode_to(buf);
    }
}

impl Decode for ContractState {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(ContractState {
            contract_id: Hash::decode_from(buf)?,
            code_hash: Hash::decode_from(buf)?,
            initial_state_hash: Hash::decode_from(buf)?,
            fields: Vec::<I256>::decode_from(buf)?,
        })
    }
}

impl Encode for LogState {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.tx_id.encode_to(buf);
        self.index.encode_to(buf);
        self.fields.encode_to(buf);
    }
}

impl Decode for LogState {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(LogState {
            tx_id: Hash::decode_from(buf)?,
            index: u32::decode_from(buf)?,
            fields: Vec::<I256>::decode_from(buf)?,
        })
    }
}

impl Encode for LogStates {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.contract_id.encode_to(buf);
        self.block_hash.encode_to(buf);
        self.states.encode_to(buf);
    }
}

impl Decode for LogStates {
    fn decode_from(buf: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(LogStates {
            contract_id: Hash::decode_from(buf)?,
            block_hash: Hash::decode_from(buf)?,
            states: Vec::<LogState>::decode_from(buf)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Address;

    #[test]
    fn u256_minimal_be_round_trip() {
        for v in [0u64, 1, 255, 65536, u64::MAX] {
            let value = U256::from(v);
            let bytes = encode(&value).unwrap();
            let back: U256 = decode(&bytes).unwrap();
            assert_eq!(value, back);
        }
    }

    #[test]
    fn zero_encodes_as_empty_mantissa() {
        let bytes = encode(&U256::zero()).unwrap();
        assert_eq!(bytes, vec![0u8]);
    }

    #[test]
    fn vec_length_prefix_is_u32() {
        let v: Vec<u8> = vec![1, 2, 3];
        let bytes = encode(&v).unwrap();
        assert_eq!(&bytes[0..4], &3u32.to_le_bytes());
    }

    #[test]
    fn output_ref_round_trip() {
        let r = OutputRef::new(-7, Hash::blake2b(b"output"));
        let bytes = encode(&r).unwrap();
        let back: OutputRef = decode(&bytes).unwrap();
        assert_eq!(r, back);
    }

    #[test]
    fn address_round_trip_through_codec() {
        let addr = Address::P2C(Hash::keccak(b"contract"));
        let bytes = encode(&addr).unwrap();
        let back: Address = decode(&bytes).unwrap();
        assert_eq!(addr, back);
    }

    #[test]
    fn i256_round_trip() {
        let v = I256::from_i128(-42);
        let bytes = encode(&v).unwrap();
        let back: I256 = decode(&bytes).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = encode(&1u32).unwrap();
        bytes.push(0xFF);
        let result: Result<u32, CodecError> = decode(&bytes);
        assert_eq!(result, Err(CodecError::TrailingBytes));
    }
}
