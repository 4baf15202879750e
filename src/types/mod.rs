//! Core data types: blocks, headers, transactions, and UTXO entries.

pub mod block;
pub mod transaction;

pub use block::{Block, BlockHeader};
pub use transaction::{OutPoint, Transaction, TxInput, TxOutput, UtxoEntry};
