//! Block header and block types, with canonical big-endian encoding for
//! hashing, and deterministic genesis construction.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::hash::{sha256, Hash256, ZERO_HASH};
use crate::types::transaction::{Transaction, TxOutput};
use crate::util::merkle::merkle_root;

/// Fixed timestamp of the genesis block, matching the historical Bitcoin
/// genesis timestamp used as this design's deterministic anchor.
pub const GENESIS_TIMESTAMP: i64 = 1_231_006_505;

/// Placeholder script paying the genesis coinbase; not a real spendable
/// script since signature verification is out of scope here.
pub const GENESIS_COINBASE_SCRIPT: &[u8] = b"COINBASE_0";

/// Block header. Immutable once hashed; every field participates in the
/// canonical encoding used to compute the block hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_block_hash: Hash256,
    pub merkle_root: Hash256,
    pub timestamp: i64,
    pub difficulty: u64,
    pub nonce: u64,
    pub height: u64,
}

impl BlockHeader {
    /// Canonical byte encoding: version(4) | prev_block_hash(32) |
    /// merkle_root(32) | timestamp(8) | difficulty(8) | nonce(8) |
    /// height(8), all big-endian, fixed-width, no length prefixes. 100
    /// bytes total.
    pub fn canonical_encoding(&self) -> [u8; 100] {
        let mut buf = [0u8; 100];
        buf[0..4].copy_from_slice(&self.version.to_be_bytes());
        buf[4..36].copy_from_slice(&self.prev_block_hash);
        buf[36..68].copy_from_slice(&self.merkle_root);
        buf[68..76].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[76..84].copy_from_slice(&self.difficulty.to_be_bytes());
        buf[84..92].copy_from_slice(&self.nonce.to_be_bytes());
        buf[92..100].copy_from_slice(&self.height.to_be_bytes());
        buf
    }

    /// Block hash: single SHA-256 of the canonical header encoding.
    pub fn hash(&self) -> Hash256 {
        sha256(&self.canonical_encoding())
    }
}

/// A header plus its ordered, non-empty transaction list. The first
/// transaction is always the coinbase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Block hash, delegating to the header.
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }

    /// Recompute the Merkle root over this block's transaction hashes.
    pub fn compute_merkle_root(&self) -> Hash256 {
        let hashes: Vec<Hash256> = self.transactions.iter().map(Transaction::hash).collect();
        merkle_root(&hashes)
    }

    /// Approximate encoded size in bytes: header plus each transaction's
    /// canonical encoding. Used against `max_block_size`.
    pub fn encoded_size(&self) -> usize {
        100 + self
            .transactions
            .iter()
            .map(|tx| tx.canonical_encoding().len())
            .sum::<usize>()
    }

    /// The deterministic genesis block: fixed header fields, a single
    /// coinbase transaction paying `config.genesis_block_reward` to the
    /// well-known placeholder script.
    pub fn genesis(config: &Config) -> Self {
        let coinbase = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![TxOutput {
                value: config.genesis_block_reward,
                script_pubkey: GENESIS_COINBASE_SCRIPT.to_vec(),
            }],
            lock_time: 0,
            fee: 0,
        };
        let transactions = vec![coinbase];
        let merkle = merkle_root(&transactions.iter().map(Transaction::hash).collect::<Vec<_>>());
        let header = BlockHeader {
            version: 1,
            prev_block_hash: ZERO_HASH,
            merkle_root: merkle,
            timestamp: GENESIS_TIMESTAMP,
            difficulty: 1,
            nonce: 0,
            height: 0,
        };
        Block {
            header,
            transactions,
        }
    }
}
