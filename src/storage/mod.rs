//! Storage Interface: the minimal capability set the core requires of
//! durable storage. The core does not prescribe a backend; callers
//! inject anything that satisfies `Storage`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::StorageError;
use crate::hash::{Hash256, ZERO_HASH};
use crate::types::Block;

/// The persisted chain-head pointer: best block hash and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainStateRecord {
    pub best_block_hash: Hash256,
    pub height: u64,
}

impl ChainStateRecord {
    /// The record reported for an uninitialized chain: zero hash,
    /// height 0.
    pub fn uninitialized() -> Self {
        Self {
            best_block_hash: ZERO_HASH,
            height: 0,
        }
    }

    pub fn is_uninitialized(&self) -> bool {
        self.height == 0 && self.best_block_hash == ZERO_HASH
    }
}

/// The durable storage contract the core consumes. Expected to be
/// crash-consistent per operation; the core recovers from a crash
/// between operations by relying on `chain_state` always being written
/// after the block body it points to.
pub trait Storage: Send + Sync {
    fn get_chain_state(&self) -> Result<ChainStateRecord, StorageError>;
    fn store_chain_state(&self, state: ChainStateRecord) -> Result<(), StorageError>;
    fn store_block(&self, block: &Block) -> Result<(), StorageError>;
    fn get_block(&self, hash: &Hash256) -> Result<Block, StorageError>;
    fn close(&self) -> Result<(), StorageError>;
}

/// Any shared, reference-counted backend is itself a valid backend —
/// lets a caller hold on to a storage handle (e.g. to reopen a
/// `ChainStateManager` against it later) while also handing it to the
/// manager, which takes storage by value.
impl<T: Storage + ?Sized> Storage for Arc<T> {
    fn get_chain_state(&self) -> Result<ChainStateRecord, StorageError> {
        (**self).get_chain_state()
    }

    fn store_chain_state(&self, state: ChainStateRecord) -> Result<(), StorageError> {
        (**self).store_chain_state(state)
    }

    fn store_block(&self, block: &Block) -> Result<(), StorageError> {
        (**self).store_block(block)
    }

    fn get_block(&self, hash: &Hash256) -> Result<Block, StorageError> {
        (**self).get_block(hash)
    }

    fn close(&self) -> Result<(), StorageError> {
        (**self).close()
    }
}

/// A minimal in-memory `Storage` implementation, used by this crate's
/// own tests so `ChainStateManager` can be exercised without a caller
/// supplying a real backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    chain_state: RwLock<ChainStateRecord>,
    blocks: RwLock<HashMap<Hash256, Block>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            chain_state: RwLock::new(ChainStateRecord::uninitialized()),
            blocks: RwLock::new(HashMap::new()),
        }
    }
}

impl Storage for MemoryStorage {
    fn get_chain_state(&self) -> Result<ChainStateRecord, StorageError> {
        Ok(*self.chain_state.read().unwrap())
    }

    fn store_chain_state(&self, state: ChainStateRecord) -> Result<(), StorageError> {
        *self.chain_state.write().unwrap() = state;
        Ok(())
    }

    fn store_block(&self, block: &Block) -> Result<(), StorageError> {
        self.blocks
            .write()
            .unwrap()
            .insert(block.hash(), block.clone());
        Ok(())
    }

    fn get_block(&self, hash: &Hash256) -> Result<Block, StorageError> {
        self.blocks
            .read()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| StorageError::BlockNotFound(hex::encode(hash)))
    }

    fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
