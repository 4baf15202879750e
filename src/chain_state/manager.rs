//! The Chain State Manager itself: `ChainStateManager<S>`, generic over
//! any `Storage` implementation.
//!
//! Locking follows §5 of the design this crate implements: a single
//! reader/writer lock guards the block index, tip, height, and
//! accumulated-work map. `add_block` (and therefore `fork_choice` and
//! reorganization) takes it exclusively for the whole operation, which
//! is also how UTXO writes end up serialized even though `UtxoSet`
//! carries its own internal lock.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use num_bigint::BigUint;
use num_traits::Zero;
use tracing::{info, instrument, warn};

use crate::chain_state::index::{BlockIndexEntry, BlockStatus};
use crate::config::{Config, ConsensusConfig};
use crate::consensus::ConsensusEngine;
use crate::error::{CoreError, CoreResult, TransactionError};
use crate::hash::Hash256;
use crate::storage::{ChainStateRecord, Storage};
use crate::types::{Block, OutPoint, UtxoEntry};
use crate::utxo::{apply_block_to_map, revert_block_on_map, BlockUndo, MapView, UtxoLookup, UtxoSet};

/// Everything guarded by the chain lock.
struct Inner {
    index: HashMap<Hash256, BlockIndexEntry>,
    /// Canonical occupant at each height. Side-branch blocks live only
    /// in `index`, never here.
    height_index: HashMap<u64, Hash256>,
    accumulated_work: HashMap<Hash256, BigUint>,
    tip_hash: Hash256,
    height: u64,
    genesis_hash: Hash256,
}

impl Inner {
    fn entry(&self, hash: &Hash256) -> CoreResult<&BlockIndexEntry> {
        self.index
            .get(hash)
            .ok_or_else(|| CoreError::Internal(format!("block {} missing from index", hex::encode(hash))))
    }
}

/// Owns the block index, accumulated-work map, and tip pointer; drives
/// fork choice and reorganization; serializes all writes through one
/// lock. Generic over the storage backend it's opened with.
pub struct ChainStateManager<S: Storage> {
    config: Config,
    consensus: ConsensusEngine,
    storage: S,
    utxo: UtxoSet,
    inner: RwLock<Inner>,
}

impl<S: Storage> ChainStateManager<S> {
    /// Open the manager against `storage`. If storage reports an empty
    /// chain, constructs and persists the deterministic genesis block,
    /// seeding the UTXO set with its coinbase. Otherwise replays the
    /// persisted canonical chain from genesis forward to rebuild the
    /// in-memory index, UTXO set, and accumulated-work map — this
    /// crate's storage contract (§6) carries only block bodies and the
    /// chain-head pointer, not per-block undo logs, so undo data is
    /// always recomputed rather than persisted.
    pub fn open(config: Config, consensus_config: ConsensusConfig, storage: S) -> CoreResult<Self> {
        let consensus = ConsensusEngine::new(consensus_config);
        let utxo = UtxoSet::new();
        let persisted = storage.get_chain_state()?;

        let inner = if persisted.is_uninitialized() {
            let genesis = Block::genesis(&config);
            let hash = genesis.hash();
            storage.store_block(&genesis)?;
            let undo = utxo
                .apply_block(&genesis, 0)
                .map_err(|e| CoreError::Internal(format!("genesis UTXO seed failed: {e}")))?;

            let mut index = HashMap::new();
            index.insert(
                hash,
                BlockIndexEntry {
                    block: genesis,
                    status: BlockStatus::Canonical,
                    undo: Some(undo),
                },
            );
            let mut height_index = HashMap::new();
            height_index.insert(0, hash);
            let mut accumulated_work = HashMap::new();
            accumulated_work.insert(hash, BigUint::zero());

            storage.store_chain_state(ChainStateRecord {
                best_block_hash: hash,
                height: 0,
            })?;

            Inner {
                index,
                height_index,
                accumulated_work,
                tip_hash: hash,
                height: 0,
                genesis_hash: hash,
            }
        } else {
            Self::replay_canonical_chain(&storage, &utxo, persisted)?
        };

        Ok(Self {
            config,
            consensus,
            storage,
            utxo,
            inner: RwLock::new(inner),
        })
    }

    /// Walk back from the persisted tip to genesis via `prev_block_hash`,
    /// then replay forward through the UTXO set, rebuilding the index,
    /// height index, and accumulated-work map as it goes.
    fn replay_canonical_chain(storage: &S, utxo: &UtxoSet, persisted: ChainStateRecord) -> CoreResult<Inner> {
        let mut chain = Vec::new();
        let mut cursor = storage.get_block(&persisted.best_block_hash)?;
        loop {
            let is_genesis = cursor.header.prev_block_hash == crate::hash::ZERO_HASH && cursor.header.height == 0;
            let prev_hash = cursor.header.prev_block_hash;
            chain.push(cursor.clone());
            if is_genesis {
                break;
            }
            cursor = storage.get_block(&prev_hash)?;
        }
        chain.reverse();

        let mut index = HashMap::new();
        let mut height_index = HashMap::new();
        let mut accumulated_work = HashMap::new();
        let mut work = BigUint::zero();

        for block in &chain {
            let hash = block.hash();
            let undo = utxo
                .apply_block(block, block.header.height)
                .map_err(|e| CoreError::Internal(format!("replay of persisted chain failed: {e}")))?;
            // Genesis's own difficulty is not counted: accumulated work
            // at genesis is 0, and each subsequent block contributes its
            // own difficulty on top of its parent's.
            if block.header.height > 0 {
                work += BigUint::from(block.header.difficulty);
            }
            index.insert(
                hash,
                BlockIndexEntry {
                    block: block.clone(),
                    status: BlockStatus::Canonical,
                    undo: Some(undo),
                },
            );
            height_index.insert(block.header.height, hash);
            accumulated_work.insert(hash, work.clone());
        }

        let tip = chain
            .last()
            .ok_or_else(|| CoreError::Internal("persisted chain state points at an empty chain".into()))?;
        let genesis_hash = chain.first().unwrap().hash();
        let tip_hash = tip.hash();
        if tip.header.height != persisted.height {
            return Err(CoreError::Internal(format!(
                "replayed tip height {} disagrees with persisted height {}",
                tip.header.height, persisted.height
            )));
        }

        Ok(Inner {
            index,
            height_index,
            accumulated_work,
            tip_hash,
            height: persisted.height,
            genesis_hash,
        })
    }

    // ---- read-only queries ----------------------------------------

    pub fn get_block(&self, hash: &Hash256) -> CoreResult<Option<Block>> {
        {
            let inner = self.inner.read().unwrap();
            if let Some(entry) = inner.index.get(hash) {
                return Ok(Some(entry.block.clone()));
            }
        }
        match self.storage.get_block(hash) {
            Ok(block) => {
                let mut inner = self.inner.write().unwrap();
                inner.index.entry(*hash).or_insert_with(|| BlockIndexEntry {
                    block: block.clone(),
                    status: BlockStatus::Indexed,
                    undo: None,
                });
                Ok(Some(block))
            }
            Err(crate::error::StorageError::BlockNotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_block_by_height(&self, height: u64) -> CoreResult<Option<Block>> {
        let hash = {
            let inner = self.inner.read().unwrap();
            inner.height_index.get(&height).copied()
        };
        match hash {
            Some(hash) => self.get_block(&hash),
            None => Ok(None),
        }
    }

    pub fn get_best_block(&self) -> CoreResult<Block> {
        let inner = self.inner.read().unwrap();
        Ok(inner.entry(&inner.tip_hash)?.block.clone())
    }

    pub fn get_height(&self) -> u64 {
        self.inner.read().unwrap().height
    }

    pub fn get_tip_hash(&self) -> Hash256 {
        self.inner.read().unwrap().tip_hash
    }

    pub fn get_genesis_block(&self) -> CoreResult<Block> {
        let inner = self.inner.read().unwrap();
        Ok(inner.entry(&inner.genesis_hash)?.block.clone())
    }

    pub fn get_accumulated_work(&self, height: u64) -> CoreResult<BigUint> {
        let mut inner = self.inner.write().unwrap();
        let hash = *inner
            .height_index
            .get(&height)
            .ok_or_else(|| CoreError::Internal(format!("no canonical block at height {height}")))?;
        self.work_of(&mut inner, hash)
    }

    /// Current suggested difficulty for the next block a miner would
    /// build, per the Consensus Engine's advisory state.
    pub fn get_difficulty(&self) -> u64 {
        self.consensus.get_difficulty()
    }

    /// Whether `outpoint` is unspent in the live canonical-chain UTXO set.
    pub fn utxo_contains(&self, outpoint: &OutPoint) -> bool {
        self.utxo.contains(outpoint)
    }

    /// The live UTXO entry for `outpoint`, if unspent.
    pub fn utxo_get(&self, outpoint: &OutPoint) -> Option<UtxoEntry> {
        self.utxo.get(outpoint)
    }

    pub fn close(&self) -> CoreResult<()> {
        self.storage.close()?;
        Ok(())
    }

    // ---- accumulated work -------------------------------------------

    /// Cached-or-computed accumulated work for `hash`, walking parent
    /// pointers back through the index when the cache has nothing for
    /// it, and memoizing as it unwinds.
    fn work_of(&self, inner: &mut Inner, hash: Hash256) -> CoreResult<BigUint> {
        if let Some(w) = inner.accumulated_work.get(&hash) {
            return Ok(w.clone());
        }
        let header = inner.entry(&hash)?.block.header.clone();
        let work = if hash == inner.genesis_hash {
            // Genesis contributes no work of its own; see `replay_canonical_chain`.
            BigUint::zero()
        } else {
            let parent_work = self.work_of(inner, header.prev_block_hash)?;
            parent_work + BigUint::from(header.difficulty)
        };
        inner.accumulated_work.insert(hash, work.clone());
        Ok(work)
    }

    // ---- block submission --------------------------------------------

    /// Submit a candidate block. Validates it against consensus and
    /// chain rules with the parent it names, commits it to storage and
    /// the index, and advances the tip (possibly via reorganization) if
    /// it improves fork choice.
    #[instrument(skip(self, block), fields(height = block.header.height))]
    pub fn add_block(&self, block: Block) -> CoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        self.add_block_locked(&mut inner, block)
    }

    /// `AddBlock` if it would improve the current tip (directly extend
    /// it, or exceed its accumulated work); otherwise an error, with no
    /// change to the canonical chain. Unlike `add_block`, a block that
    /// would merely be indexed as a side branch is rejected outright
    /// here — the tip-improvement check runs before anything is stored
    /// or indexed, so the error path leaves no trace of the block.
    pub fn fork_choice(&self, block: Block) -> CoreResult<()> {
        let parent_hash = block.header.prev_block_hash;

        {
            let mut inner = self.inner.write().unwrap();
            if inner.index.contains_key(&block.hash()) {
                return Err(CoreError::DuplicateBlock);
            }
            if !inner.index.contains_key(&parent_hash) {
                return Err(CoreError::UnknownParent);
            }

            let parent_work = self.work_of(&mut inner, parent_hash)?;
            let this_work = parent_work + BigUint::from(block.header.difficulty);
            let tip_work = self.work_of(&mut inner, inner.tip_hash)?;
            let extends_tip = parent_hash == inner.tip_hash;

            if !extends_tip && this_work <= tip_work {
                return Err(CoreError::InvalidInput(
                    "block does not improve the tip".into(),
                ));
            }
        }

        self.add_block(block)
    }

    fn add_block_locked(&self, inner: &mut Inner, block: Block) -> CoreResult<()> {
        self.validate_structure(&block)?;

        let hash = block.hash();
        if inner.index.contains_key(&hash) {
            return Err(CoreError::DuplicateBlock);
        }

        let parent_hash = block.header.prev_block_hash;
        let parent_header = inner
            .index
            .get(&parent_hash)
            .map(|e| e.block.header.clone())
            .ok_or(CoreError::UnknownParent)?;

        if block.header.height != parent_header.height + 1 {
            return Err(CoreError::HeightDiscontinuity {
                expected: parent_header.height + 1,
                actual: block.header.height,
            });
        }

        let size = block.encoded_size() as u64;
        if size > self.config.max_block_size {
            return Err(CoreError::BlockTooLarge {
                size: size as usize,
                max_size: self.config.max_block_size,
            });
        }

        let expected_diff = self.expected_difficulty_at(inner, &parent_header, block.header.height)?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        self.consensus
            .validate_block(&block, &parent_header, now, expected_diff, false)?;

        let view = self.materialize_view(inner, parent_hash)?;
        self.validate_block_transactions(&block, &MapView(&view))?;

        self.storage
            .store_block(&block)
            .map_err(|e| CoreError::StorageFailure { op: "store_block", source: e })?;

        let parent_work = self.work_of(inner, parent_hash)?;
        let this_work = parent_work + BigUint::from(block.header.difficulty);

        inner.index.insert(
            hash,
            BlockIndexEntry {
                block: block.clone(),
                status: BlockStatus::Indexed,
                undo: None,
            },
        );
        inner.accumulated_work.insert(hash, this_work.clone());

        let tip_work = self.work_of(inner, inner.tip_hash)?;
        let extends_tip = parent_hash == inner.tip_hash;
        if !extends_tip && this_work <= tip_work {
            // Valid and indexed, but not the new best chain: tracked as
            // a known side branch rather than connected.
            inner.index.get_mut(&hash).unwrap().status = BlockStatus::SideBranch;
            return Ok(());
        }

        if extends_tip {
            self.connect_tip(inner, hash)
        } else {
            self.reorganize(inner, hash)
        }
    }

    /// Structural sanity of a block independent of any parent: non-empty
    /// transaction list, first transaction a coinbase, no other
    /// transaction a coinbase.
    fn validate_structure(&self, block: &Block) -> CoreResult<()> {
        if block.transactions.is_empty() {
            return Err(TransactionError::EmptyBlock.into());
        }
        if !block.transactions[0].is_coinbase() {
            return Err(TransactionError::MissingCoinbase.into());
        }
        if block.transactions[1..].iter().any(|tx| tx.is_coinbase()) {
            return Err(TransactionError::UnexpectedCoinbase.into());
        }
        Ok(())
    }

    /// The difficulty expected at `height`, consulting the canonical
    /// height index for the timing of the last retarget window. Falls
    /// back to the parent's difficulty away from a retarget boundary,
    /// matching `ExpectedDifficulty`.
    fn expected_difficulty_at(&self, inner: &Inner, parent: &crate::types::BlockHeader, height: u64) -> CoreResult<u64> {
        let interval = self.consensus.config().retarget_interval;
        if interval == 0 || height % interval != 0 || height < interval {
            return Ok(self.consensus.expected_difficulty(parent.difficulty, height, 0));
        }
        let window_start_height = height - interval;
        let window_start_hash = inner
            .height_index
            .get(&window_start_height)
            .copied()
            .ok_or_else(|| CoreError::Internal("retarget window start not canonical".into()))?;
        let window_start = inner.entry(&window_start_hash)?.block.header.timestamp;
        let actual_interval = (parent.timestamp - window_start).max(0) as u64;
        Ok(self.consensus.expected_difficulty(parent.difficulty, height, actual_interval))
    }

    /// Validate every transaction in `block` against `view`: coinbase
    /// output value against subsidy plus declared fees, every other
    /// transaction against the UTXO entries it spends. Also rejects two
    /// transactions in the same block spending the same outpoint — each
    /// transaction's own inputs are checked for internal duplicates by
    /// `UtxoSet::validate_transaction`, but that check can't see across
    /// transactions, so this tracks every outpoint spent anywhere in the
    /// block.
    fn validate_block_transactions(&self, block: &Block, view: &dyn UtxoLookup) -> CoreResult<()> {
        let fees: u64 = block.transactions[1..]
            .iter()
            .try_fold(0u64, |acc, tx| acc.checked_add(tx.fee))
            .ok_or_else(|| CoreError::InvalidTransaction(TransactionError::OutputValueOverflow))?;
        let subsidy_plus_fees = self.config.genesis_block_reward.checked_add(fees);

        let mut spent_in_block: HashSet<OutPoint> = HashSet::new();
        for tx in &block.transactions {
            if !tx.is_coinbase() {
                for input in &tx.inputs {
                    let outpoint = input.outpoint();
                    if !spent_in_block.insert(outpoint) {
                        return Err(CoreError::InvalidTransaction(TransactionError::DuplicateInput(outpoint)));
                    }
                }
            }

            UtxoSet::validate_transaction(
                tx,
                view,
                block.header.height,
                self.config.coinbase_maturity,
                if tx.is_coinbase() { subsidy_plus_fees } else { None },
            )?;
        }
        Ok(())
    }

    /// Same check, against the live UTXO set directly — used during
    /// reorg connection, where the live set has already been rolled to
    /// exactly the state each connect-list block expects.
    fn validate_block_transactions_live(&self, block: &Block) -> CoreResult<()> {
        self.validate_block_transactions(block, &self.utxo)
    }

    /// Build a read-only UTXO view as of `target` having been applied
    /// (but nothing after it). When `target` is the live tip this is a
    /// plain snapshot; otherwise it's reconstructed by disconnecting the
    /// live set down to the common ancestor and reconnecting up to
    /// `target`, all on a disposable clone.
    fn materialize_view(&self, inner: &Inner, target: Hash256) -> CoreResult<HashMap<OutPoint, UtxoEntry>> {
        if target == inner.tip_hash {
            return Ok(self.utxo.snapshot());
        }

        let ancestor = self.common_ancestor(inner, target, inner.tip_hash)?;
        let mut map = self.utxo.snapshot();

        for hash in self.chain_to_ancestor(inner, inner.tip_hash, ancestor)? {
            let undo = inner
                .entry(&hash)?
                .undo
                .as_ref()
                .ok_or_else(|| CoreError::Internal("canonical block missing undo log".into()))?;
            revert_block_on_map(&mut map, undo);
        }

        let mut connect = self.chain_to_ancestor(inner, target, ancestor)?;
        connect.reverse();
        for hash in connect {
            let entry = inner.entry(&hash)?;
            apply_block_to_map(&mut map, &entry.block, entry.block.header.height)?;
        }

        Ok(map)
    }

    /// Blocks from `from` back to (but excluding) `ancestor`, newest
    /// first, walking parent pointers through the index.
    fn chain_to_ancestor(&self, inner: &Inner, from: Hash256, ancestor: Hash256) -> CoreResult<Vec<Hash256>> {
        let mut out = Vec::new();
        let mut cursor = from;
        while cursor != ancestor {
            out.push(cursor);
            cursor = inner.entry(&cursor)?.block.header.prev_block_hash;
        }
        Ok(out)
    }

    /// The most recent block hash common to both `a`'s and `b`'s
    /// ancestry, found by equalizing heights and then stepping both
    /// chains back together.
    fn common_ancestor(&self, inner: &Inner, a: Hash256, b: Hash256) -> CoreResult<Hash256> {
        let mut a = a;
        let mut b = b;
        let mut a_height = inner.entry(&a)?.block.header.height;
        let mut b_height = inner.entry(&b)?.block.header.height;

        while a_height > b_height {
            a = inner.entry(&a)?.block.header.prev_block_hash;
            a_height -= 1;
        }
        while b_height > a_height {
            b = inner.entry(&b)?.block.header.prev_block_hash;
            b_height -= 1;
        }
        while a != b {
            a = inner.entry(&a)?.block.header.prev_block_hash;
            b = inner.entry(&b)?.block.header.prev_block_hash;
        }
        Ok(a)
    }

    /// Fast path: `hash` directly extends the current tip. Always
    /// accepted once it's passed validation.
    fn connect_tip(&self, inner: &mut Inner, hash: Hash256) -> CoreResult<()> {
        let block = inner.entry(&hash)?.block.clone();
        let height = block.header.height;
        let parent_timestamp = inner.entry(&block.header.prev_block_hash)?.block.header.timestamp;
        let time_delta = (block.header.timestamp - parent_timestamp).max(0) as u64;

        let undo = self
            .utxo
            .apply_block(&block, height)
            .map_err(|e| CoreError::Internal(format!("validated block failed to apply: {e}")))?;

        if let Err(e) = self.storage.store_chain_state(ChainStateRecord {
            best_block_hash: hash,
            height,
        }) {
            self.utxo.revert_block(&undo);
            return Err(CoreError::StorageFailure { op: "store_chain_state", source: e });
        }

        let entry = inner.index.get_mut(&hash).unwrap();
        entry.status = BlockStatus::Canonical;
        entry.undo = Some(undo);
        inner.height_index.insert(height, hash);
        inner.tip_hash = hash;
        inner.height = height;

        self.consensus.update_difficulty(block.header.difficulty, time_delta);
        info!(height, hash = %hex::encode(hash), "tip advanced");
        Ok(())
    }

    /// Switch the canonical chain from the current tip to `new_tip`,
    /// reverting the disconnected side and replaying the connecting
    /// side, rolling back to the prior tip in full on any failure.
    fn reorganize(&self, inner: &mut Inner, new_tip: Hash256) -> CoreResult<()> {
        let old_tip = inner.tip_hash;
        let ancestor = self.common_ancestor(inner, new_tip, old_tip)?;

        let disconnect = self.chain_to_ancestor(inner, old_tip, ancestor)?; // newest..ancestor+1
        if disconnect.len() as u64 > self.config.max_reorg_depth {
            return Err(CoreError::ReorgTooDeep);
        }
        let mut connect = self.chain_to_ancestor(inner, new_tip, ancestor)?; // newest(new_tip)..ancestor+1
        connect.reverse(); // ancestor+1..new_tip, oldest first

        warn!(
            disconnect = disconnect.len(),
            connect = connect.len(),
            ancestor = %hex::encode(ancestor),
            "reorganizing canonical chain"
        );

        self.revert_canonical_range(inner, &disconnect);

        if let Err(e) = self.apply_canonical_range(inner, &connect) {
            // Connect side failed atomically on its own; restore the
            // disconnected side to get back to `old_tip`.
            let mut relink = disconnect.clone();
            relink.reverse();
            self.apply_canonical_range(inner, &relink)
                .expect("re-applying the previously-canonical chain cannot fail");
            return Err(e);
        }

        let new_height = inner.entry(&new_tip)?.block.header.height;
        if let Err(e) = self.storage.store_chain_state(ChainStateRecord {
            best_block_hash: new_tip,
            height: new_height,
        }) {
            self.revert_canonical_range(inner, &{
                let mut v = connect.clone();
                v.reverse();
                v
            });
            let mut relink = disconnect.clone();
            relink.reverse();
            self.apply_canonical_range(inner, &relink)
                .expect("re-applying the previously-canonical chain cannot fail");
            return Err(CoreError::StorageFailure { op: "store_chain_state", source: e });
        }

        inner.tip_hash = new_tip;
        inner.height = new_height;
        Ok(())
    }

    /// Revert a canonical range, newest block first: undo its UTXO
    /// effects, demote it to `SideBranch`, and drop its height-index
    /// occupancy. Infallible — every entry here is canonical and
    /// carries an undo log by construction.
    fn revert_canonical_range(&self, inner: &mut Inner, range_newest_first: &[Hash256]) {
        for hash in range_newest_first {
            let (undo, height) = {
                let entry = inner.index.get(hash).expect("canonical block indexed");
                (entry.undo.clone().expect("canonical block has undo log"), entry.block.header.height)
            };
            self.utxo.revert_block(&undo);
            let entry = inner.index.get_mut(hash).unwrap();
            entry.status = BlockStatus::SideBranch;
            entry.undo = None;
            inner.height_index.remove(&height);
        }
    }

    /// Apply a range of blocks oldest-first, re-validating each against
    /// the live (rolling) UTXO view before applying it. Atomic: on any
    /// failure midway, everything this call applied is reverted before
    /// the error is returned, leaving the live set exactly as found.
    fn apply_canonical_range(&self, inner: &mut Inner, range_oldest_first: &[Hash256]) -> CoreResult<()> {
        let mut applied: Vec<(Hash256, BlockUndo)> = Vec::new();

        for hash in range_oldest_first {
            let block = inner.entry(hash)?.block.clone();
            let result = self
                .validate_block_transactions_live(&block)
                .and_then(|_| {
                    self.utxo
                        .apply_block(&block, block.header.height)
                        .map_err(|e| CoreError::Internal(format!("reorg connect failed to apply: {e}")))
                });
            match result {
                Ok(undo) => applied.push((*hash, undo)),
                Err(e) => {
                    for (_, undo) in applied.iter().rev() {
                        self.utxo.revert_block(undo);
                    }
                    return Err(e);
                }
            }
        }

        for (hash, undo) in applied {
            let height = inner.entry(&hash)?.block.header.height;
            let entry = inner.index.get_mut(&hash).unwrap();
            entry.status = BlockStatus::Canonical;
            entry.undo = Some(undo);
            inner.height_index.insert(height, hash);
        }
        Ok(())
    }
}
