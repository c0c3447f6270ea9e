//! Leaves-first primitives (§2.1): hashes, addresses, the signed/unsigned
//! 256-bit integers the VM operates on, PoW targets, signatures, and chain
//! indices. Nothing in this module depends on storage, validation, or the VM.

mod address;
mod chain_index;
mod hash;
mod signature;
mod target;
mod uint;

pub use address::{Address, AddressDecodeError};
pub use chain_index::ChainIndex;
pub use hash::Hash;
pub use signature::{Signature, SignatureError};
pub use target::Target;
pub use uint::{I256, U256};
