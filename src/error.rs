//! Crate-wide error handling.
//!
//! A single aggregated error type, built with `thiserror`, with one
//! variant per failure mode the core can produce. Sub-errors convert in
//! via `#[from]` so call sites can propagate with `?`.

use thiserror::Error;

use crate::types::OutPoint;

/// Top-level error type returned by every fallible core operation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown parent block")]
    UnknownParent,

    #[error("height discontinuity: expected {expected}, got {actual}")]
    HeightDiscontinuity { expected: u64, actual: u64 },

    #[error("timestamp regression: {timestamp} < parent timestamp {parent_timestamp}")]
    TimestampRegression { timestamp: i64, parent_timestamp: i64 },

    #[error("timestamp too far in the future: {timestamp} > {limit}")]
    TimestampTooFarFuture { timestamp: i64, limit: i64 },

    #[error("block too large: {size} > {max_size}")]
    BlockTooLarge { size: usize, max_size: u64 },

    #[error("invalid merkle root")]
    InvalidMerkleRoot,

    #[error("invalid proof of work")]
    InvalidProofOfWork,

    #[error("invalid difficulty: expected {expected}, got {actual}")]
    InvalidDifficulty { expected: u64, actual: u64 },

    #[error("invalid transaction: {0}")]
    InvalidTransaction(#[from] TransactionError),

    #[error("block already exists")]
    DuplicateBlock,

    #[error("reorg too deep")]
    ReorgTooDeep,

    #[error("storage failure during {op}: {source}")]
    StorageFailure {
        op: &'static str,
        #[source]
        source: StorageError,
    },

    /// Invariant violated. Should never surface; implies a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

/// Reasons a transaction can fail validation against the UTXO set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("input outpoint not found: {0:?}")]
    MissingInput(OutPoint),

    #[error("duplicate input within a transaction: {0:?}")]
    DuplicateInput(OutPoint),

    #[error("input value overflow while summing {0} inputs")]
    InputValueOverflow(usize),

    #[error("output value overflow")]
    OutputValueOverflow,

    #[error("inputs {inputs} are less than outputs {outputs} plus fee {fee}")]
    InsufficientInputValue { inputs: u64, outputs: u64, fee: u64 },

    #[error("coinbase output {0:?} is younger than the maturity threshold")]
    ImmatureCoinbase(OutPoint),

    #[error("coinbase output value {actual} exceeds subsidy plus fees {allowed}")]
    InvalidCoinbaseValue { actual: u64, allowed: u64 },

    #[error("block has no transactions")]
    EmptyBlock,

    #[error("first transaction in block is not a coinbase")]
    MissingCoinbase,

    #[error("non-first transaction is a coinbase")]
    UnexpectedCoinbase,
}

/// Errors surfaced by a `Storage` implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("block not found: {0}")]
    BlockNotFound(String),
}

/// Convert a storage error into the top-level error with a fixed
/// operation label. Call sites needing a more specific `op` construct
/// `CoreError::StorageFailure` directly instead of using `?`.
impl From<StorageError> for CoreError {
    fn from(source: StorageError) -> Self {
        CoreError::StorageFailure {
            op: "storage",
            source,
        }
    }
}
