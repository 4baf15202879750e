//! Per-block bookkeeping kept by the Chain State Manager's index.

use crate::types::Block;
use crate::utxo::BlockUndo;

/// Where a block sits relative to the canonical chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    /// Body stored, parent known, but not (or no longer) on the
    /// canonical chain and not tracked as a side branch either — e.g. a
    /// block fetched purely for a read query.
    Indexed,
    /// On the current best chain.
    Canonical,
    /// Known, valid, but not on the current best chain.
    SideBranch,
}

/// One entry in the block index.
#[derive(Debug, Clone)]
pub struct BlockIndexEntry {
    pub block: Block,
    pub status: BlockStatus,
    /// The UTXO undo log for this block's application, present only
    /// while the block is `Canonical`. Consulted by reorg and by
    /// historical UTXO-view materialization.
    pub undo: Option<BlockUndo>,
}
