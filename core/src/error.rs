//! Error types for the **flowchain** core crate.
//!
//! All high-level operations return [`crate::Result`], an alias for
//! `core::result::Result<T, Error>`. Errors are grouped the way the consuming
//! actors are expected to handle them: IO errors escalate toward shutdown,
//! validation errors are dropped locally, [`Error::MissingDeps`] is a park-and-retry
//! signal, and [`Error::AlreadyExists`] is not really an error at all.

use thiserror::Error;

use crate::primitives::Hash;

/// Reasons a transaction or block failed stateful/stateless checks.
///
/// Every variant maps to a rejected block/tx with **no** state mutation —
/// callers never need to unwind partial effects for these.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("header hash does not meet target")]
    InvalidPoW,
    #[error("target outside allowed retarget band")]
    InvalidTarget,
    #[error("declared chain index does not match hash")]
    InvalidChainIndex,
    #[error("timestamp exceeds allowed clock drift")]
    InvalidTimestamp,
    #[error("block dependencies malformed: {0}")]
    InvalidDeps(&'static str),
    #[error("txsHash does not match hash of transactions")]
    InvalidTxHash,
    #[error("depStateHash does not match computed post-state commitment")]
    InvalidStateCommitment,
    #[error("signature failed to verify")]
    InvalidSignature,
    #[error("sum of inputs is less than sum of outputs plus fee")]
    InsufficientFunds,
    #[error("token {0:?} not conserved across inputs/outputs")]
    TokenImbalance(Hash),
    #[error("script execution failed: {0}")]
    ScriptExecutionFailed(String),
    #[error("execution ran out of gas")]
    OutOfGas,
    #[error("input referenced more than once in the same transaction")]
    DuplicateInput,
    #[error("referenced output is missing or already spent")]
    MissingInput,
}

/// Core crate error type (§7 ERROR HANDLING DESIGN).
#[derive(Debug, Error)]
pub enum Error {
    /// Disk read/write or encoding corruption. Fatal for the affected batch.
    #[error("storage io error: {0}")]
    Io(String),

    /// Malformed wire or disk bytes.
    #[error("deserialization failed: {0}")]
    Serde(String),

    /// Block/tx rejected by validation; no state change occurred.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Block references ancestors that are not yet known locally.
    #[error("missing dependencies: {0:?}")]
    MissingDeps(Vec<Hash>),

    /// Idempotent insert of something already present; not a failure.
    #[error("already exists")]
    AlreadyExists,

    /// Contract bytecode failed to validate structurally (boundary error).
    #[error("contract compilation error: {0}")]
    Compiler(String),

    /// Caller asked for a hash/height that isn't present and did not check first.
    #[error("not found")]
    NotFound,
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serde(e.to_string())
    }
}

impl From<crate::codec::CodecError> for Error {
    fn from(e: crate::codec::CodecError) -> Self {
        Error::Serde(e.to_string())
    }
}

/// Convenient result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
