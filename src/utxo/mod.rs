//! UTXO Set: the authoritative mapping of unspent outpoints, consulted
//! by transaction validation and mutated by block application.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tracing::{debug, instrument};

use crate::error::{CoreError, CoreResult, TransactionError};
use crate::types::{Block, OutPoint, Transaction, UtxoEntry};

/// Read-only view of unspent outputs a transaction is validated
/// against. Injectable so the Chain State Manager can hand a side-branch
/// block a materialized historical view instead of the live set.
pub trait UtxoLookup {
    fn get(&self, outpoint: &OutPoint) -> Option<UtxoEntry>;
}

/// The list of outputs a block removed and created, kept so the block
/// can be reverted without re-deriving spent entries from storage.
#[derive(Debug, Clone, Default)]
pub struct BlockUndo {
    /// Entries removed by this block's non-coinbase inputs, so they can
    /// be restored on revert.
    pub spent: Vec<(OutPoint, UtxoEntry)>,
    /// Outpoints this block created, so they can be removed on revert.
    pub created: Vec<OutPoint>,
}

/// In-memory unspent-output mapping. Internally locked so it can be
/// shared across threads; the Chain State Manager still serializes all
/// writes through its own chain lock.
#[derive(Debug, Default)]
pub struct UtxoSet {
    entries: RwLock<HashMap<OutPoint, UtxoEntry>>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.entries.read().unwrap().contains_key(outpoint)
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<UtxoEntry> {
        self.entries.read().unwrap().get(outpoint).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Snapshot the full set as an owned map, for materializing a
    /// side-branch view without holding the lock across the clone.
    pub fn snapshot(&self) -> HashMap<OutPoint, UtxoEntry> {
        self.entries.read().unwrap().clone()
    }

    /// Replace the set's contents wholesale. Used when restoring a
    /// previously captured snapshot during a failed reorg rollback.
    pub fn restore(&self, snapshot: HashMap<OutPoint, UtxoEntry>) {
        *self.entries.write().unwrap() = snapshot;
    }

    /// Validate a single transaction against `view`. Coinbase
    /// transactions are checked only for output value against
    /// `subsidy_plus_fees`, never against the view.
    pub fn validate_transaction(
        tx: &Transaction,
        view: &dyn UtxoLookup,
        current_height: u64,
        coinbase_maturity: u64,
        subsidy_plus_fees: Option<u64>,
    ) -> Result<(), TransactionError> {
        if tx.is_coinbase() {
            let actual = tx
                .output_value()
                .ok_or(TransactionError::OutputValueOverflow)?;
            if let Some(allowed) = subsidy_plus_fees {
                if actual > allowed {
                    return Err(TransactionError::InvalidCoinbaseValue { actual, allowed });
                }
            }
            return Ok(());
        }

        let mut seen = HashSet::new();
        let mut input_total: u64 = 0;
        for input in &tx.inputs {
            let outpoint = input.outpoint();
            if !seen.insert(outpoint) {
                return Err(TransactionError::DuplicateInput(outpoint));
            }
            let entry = view
                .get(&outpoint)
                .ok_or(TransactionError::MissingInput(outpoint))?;

            if entry.is_coinbase {
                let age = current_height.saturating_sub(entry.height);
                if age < coinbase_maturity {
                    return Err(TransactionError::ImmatureCoinbase(outpoint));
                }
            }

            input_total = input_total
                .checked_add(entry.value)
                .ok_or(TransactionError::InputValueOverflow(tx.inputs.len()))?;
        }

        let output_total = tx
            .output_value()
            .ok_or(TransactionError::OutputValueOverflow)?;

        let required = output_total
            .checked_add(tx.fee)
            .ok_or(TransactionError::OutputValueOverflow)?;

        if input_total < required {
            return Err(TransactionError::InsufficientInputValue {
                inputs: input_total,
                outputs: output_total,
                fee: tx.fee,
            });
        }

        Ok(())
    }

    /// Apply a block's transactions: remove every non-coinbase input's
    /// outpoint (it must be present), then insert every transaction's
    /// outputs (including the coinbase's) as new entries at `height`.
    /// Returns the undo data needed to reverse this exact application.
    #[instrument(skip(self, block), fields(height = height))]
    pub fn apply_block(&self, block: &Block, height: u64) -> CoreResult<BlockUndo> {
        let mut entries = self.entries.write().unwrap();
        let undo = apply_block_to_map(&mut entries, block, height)?;
        debug!(spent = undo.spent.len(), created = undo.created.len(), "applied block");
        Ok(undo)
    }

    /// Inverse of `apply_block`: remove every output this block created,
    /// and restore every entry this block's inputs spent.
    #[instrument(skip(self, undo))]
    pub fn revert_block(&self, undo: &BlockUndo) {
        let mut entries = self.entries.write().unwrap();
        revert_block_on_map(&mut entries, undo);
        debug!(restored = undo.spent.len(), removed = undo.created.len(), "reverted block");
    }
}

/// Apply a block's transactions directly to a bare map, used both by
/// `UtxoSet::apply_block` and by historical-view materialization, which
/// replays blocks onto a disposable clone rather than the live set.
/// Atomic: a failed application leaves `entries` exactly as it found it.
pub(crate) fn apply_block_to_map(
    entries: &mut HashMap<OutPoint, UtxoEntry>,
    block: &Block,
    height: u64,
) -> CoreResult<BlockUndo> {
    let mut undo = BlockUndo::default();

    for tx in &block.transactions {
        if tx.is_coinbase() {
            continue;
        }
        for input in &tx.inputs {
            let outpoint = input.outpoint();
            match entries.remove(&outpoint) {
                Some(removed) => undo.spent.push((outpoint, removed)),
                None => {
                    // Put back every entry this call already removed so a
                    // failed application never leaves the map partially
                    // mutated.
                    for (out, entry) in undo.spent {
                        entries.insert(out, entry);
                    }
                    return Err(CoreError::Internal(format!(
                        "apply_block: missing input {outpoint:?} already validated present"
                    )));
                }
            }
        }
    }

    for tx in &block.transactions {
        let tx_hash = tx.hash();
        let is_coinbase = tx.is_coinbase();
        for (index, output) in tx.outputs.iter().enumerate() {
            let outpoint = OutPoint {
                tx_hash,
                output_index: index as u32,
            };
            entries.insert(
                outpoint,
                UtxoEntry {
                    value: output.value,
                    script_pubkey: output.script_pubkey.clone(),
                    height,
                    is_coinbase,
                },
            );
            undo.created.push(outpoint);
        }
    }

    Ok(undo)
}

/// Inverse of `apply_block_to_map`, operating on a bare map.
pub(crate) fn revert_block_on_map(entries: &mut HashMap<OutPoint, UtxoEntry>, undo: &BlockUndo) {
    for outpoint in &undo.created {
        entries.remove(outpoint);
    }
    for (outpoint, entry) in &undo.spent {
        entries.insert(*outpoint, entry.clone());
    }
}

/// `UtxoLookup` adapter over a plain map, used to materialize historical
/// or side-branch views without involving the live set's lock.
pub struct MapView<'a>(pub &'a HashMap<OutPoint, UtxoEntry>);

impl UtxoLookup for MapView<'_> {
    fn get(&self, outpoint: &OutPoint) -> Option<UtxoEntry> {
        self.0.get(outpoint).cloned()
    }
}

impl UtxoLookup for UtxoSet {
    fn get(&self, outpoint: &OutPoint) -> Option<UtxoEntry> {
        UtxoSet::get(self, outpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockHeader, TxInput, TxOutput};

    fn sample_header(height: u64) -> BlockHeader {
        BlockHeader {
            version: 1,
            prev_block_hash: [0u8; 32],
            merkle_root: [0u8; 32],
            timestamp: 0,
            difficulty: 1,
            nonce: 0,
            height,
        }
    }

    fn entry(value: u64, height: u64, is_coinbase: bool) -> UtxoEntry {
        UtxoEntry {
            value,
            script_pubkey: vec![],
            height,
            is_coinbase,
        }
    }

    #[test]
    fn coinbase_validates_on_value_only() {
        let tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![TxOutput {
                value: 50,
                script_pubkey: vec![],
            }],
            lock_time: 0,
            fee: 0,
        };
        let view = HashMap::new();
        let lookup = MapView(&view);
        assert!(UtxoSet::validate_transaction(&tx, &lookup, 10, 100, Some(50)).is_ok());
        assert!(UtxoSet::validate_transaction(&tx, &lookup, 10, 100, Some(49)).is_err());
    }

    #[test]
    fn missing_input_is_rejected() {
        let op = OutPoint {
            tx_hash: [1u8; 32],
            output_index: 0,
        };
        let tx = Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_tx_hash: op.tx_hash,
                prev_tx_index: 0,
                script_sig: vec![],
                sequence: 0,
            }],
            outputs: vec![],
            lock_time: 0,
            fee: 0,
        };
        let view = HashMap::new();
        let lookup = MapView(&view);
        let err = UtxoSet::validate_transaction(&tx, &lookup, 10, 100, None).unwrap_err();
        assert_eq!(err, TransactionError::MissingInput(op));
    }

    #[test]
    fn immature_coinbase_spend_is_rejected() {
        let op = OutPoint {
            tx_hash: [1u8; 32],
            output_index: 0,
        };
        let mut view = HashMap::new();
        view.insert(op, entry(100, 5, true));
        let lookup = MapView(&view);
        let tx = Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_tx_hash: op.tx_hash,
                prev_tx_index: 0,
                script_sig: vec![],
                sequence: 0,
            }],
            outputs: vec![TxOutput {
                value: 100,
                script_pubkey: vec![],
            }],
            lock_time: 0,
            fee: 0,
        };
        let err = UtxoSet::validate_transaction(&tx, &lookup, 10, 100, None).unwrap_err();
        assert!(matches!(err, TransactionError::ImmatureCoinbase(_)));
        assert!(UtxoSet::validate_transaction(&tx, &lookup, 105, 100, None).is_ok());
    }

    #[test]
    fn insufficient_input_value_is_rejected() {
        let op = OutPoint {
            tx_hash: [1u8; 32],
            output_index: 0,
        };
        let mut view = HashMap::new();
        view.insert(op, entry(10, 0, false));
        let lookup = MapView(&view);
        let tx = Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_tx_hash: op.tx_hash,
                prev_tx_index: 0,
                script_sig: vec![],
                sequence: 0,
            }],
            outputs: vec![TxOutput {
                value: 20,
                script_pubkey: vec![],
            }],
            lock_time: 0,
            fee: 0,
        };
        let err = UtxoSet::validate_transaction(&tx, &lookup, 10, 100, None).unwrap_err();
        assert!(matches!(err, TransactionError::InsufficientInputValue { .. }));
    }

    #[test]
    fn apply_then_revert_restores_prior_state() {
        use crate::config::Config;
        let cfg = Config::default();
        let genesis = Block::genesis(&cfg);
        let set = UtxoSet::new();
        let undo = set.apply_block(&genesis, 0).unwrap();
        assert_eq!(set.len(), 1);
        set.revert_block(&undo);
        assert!(set.is_empty());
    }

    #[test]
    fn apply_block_rolls_back_partial_removal_on_missing_input() {
        let set = UtxoSet::new();

        let funding = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![TxOutput {
                value: 10,
                script_pubkey: vec![],
            }],
            lock_time: 0,
            fee: 0,
        };
        let funding_outpoint = OutPoint {
            tx_hash: funding.hash(),
            output_index: 0,
        };
        let funding_block = Block {
            header: sample_header(0),
            transactions: vec![funding],
        };
        set.apply_block(&funding_block, 0).unwrap();
        assert!(set.contains(&funding_outpoint));

        // Spends the real funding outpoint alongside one that was never
        // created. The first removal succeeds before the second fails.
        let coinbase = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![TxOutput {
                value: 0,
                script_pubkey: vec![],
            }],
            lock_time: 0,
            fee: 0,
        };
        let coinbase_outpoint = OutPoint {
            tx_hash: coinbase.hash(),
            output_index: 0,
        };
        let spend = Transaction {
            version: 1,
            inputs: vec![
                TxInput {
                    prev_tx_hash: funding_outpoint.tx_hash,
                    prev_tx_index: 0,
                    script_sig: vec![],
                    sequence: 0,
                },
                TxInput {
                    prev_tx_hash: [7u8; 32],
                    prev_tx_index: 0,
                    script_sig: vec![],
                    sequence: 0,
                },
            ],
            outputs: vec![],
            lock_time: 0,
            fee: 0,
        };
        let spend_block = Block {
            header: sample_header(1),
            transactions: vec![coinbase, spend],
        };

        let err = set.apply_block(&spend_block, 1).unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));

        // Partial application must leave no trace: the funding outpoint
        // is still spendable, and the coinbase output was never created.
        assert!(set.contains(&funding_outpoint));
        assert!(!set.contains(&coinbase_outpoint));
        assert_eq!(set.len(), 1);
    }
}
