//! Data model entities (§3, §3.1): Block, BlockHeader, Transaction family,
//! ContractState, LogStates.

pub mod block;
pub mod contract;
pub mod transaction;

pub use block::{Block, BlockHeader};
pub use contract::{ContractState, LogState, LogStates};
pub use transaction::{
    AssetOutput, ContractOutput, OutputRef, Script, Token, Transaction, TxInput, TxOutput,
    UnsignedTransaction,
};
