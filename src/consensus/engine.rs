//! Consensus Engine: header well-formedness, proof-of-work, and
//! difficulty retargeting. Holds only configuration and a small amount
//! of advisory state; it never reaches into chain history itself — the
//! caller supplies parent data and retarget timing explicitly.

use num_bigint::BigUint;
use num_traits::One;
use std::sync::RwLock;

use crate::config::ConsensusConfig;
use crate::consensus::difficulty::expected_difficulty;
use crate::error::{CoreError, CoreResult};
use crate::hash::hash_as_uint;
use crate::types::{Block, BlockHeader};

/// Stateless (apart from an advisory difficulty suggestion) validator
/// for block headers and proof-of-work.
pub struct ConsensusEngine {
    config: ConsensusConfig,
    /// Advisory difficulty suggestion for a miner building the next
    /// block, updated via `update_difficulty`. Never consulted by
    /// `validate_block`.
    suggested_difficulty: RwLock<u64>,
}

impl ConsensusEngine {
    pub fn new(config: ConsensusConfig) -> Self {
        Self {
            config,
            suggested_difficulty: RwLock::new(1),
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Compute the 256-bit proof-of-work target for a given difficulty:
    /// `2^(256 - difficulty)`. Difficulty 0 has no valid target.
    pub fn target_for_difficulty(difficulty: u64) -> Option<BigUint> {
        if difficulty == 0 || difficulty > 256 {
            return None;
        }
        Some(BigUint::one() << (256 - difficulty as u32))
    }

    /// Check whether a block's hash satisfies its own declared
    /// difficulty's target.
    pub fn validate_proof_of_work(&self, block: &Block) -> bool {
        let Some(target) = Self::target_for_difficulty(block.header.difficulty) else {
            return false;
        };
        let hash_value = hash_as_uint(&block.hash());
        hash_value < target
    }

    /// The difficulty expected at `height`, given the parent's
    /// difficulty and, on a retarget boundary, the actual elapsed time
    /// over the last `retarget_interval` blocks.
    pub fn expected_difficulty(
        &self,
        parent_difficulty: u64,
        height: u64,
        actual_interval_secs: u64,
    ) -> u64 {
        expected_difficulty(&self.config, parent_difficulty, height, actual_interval_secs)
    }

    /// Record the time delta of the most recently connected block,
    /// updating the advisory next-block difficulty suggestion. Purely
    /// informational: does not gate `validate_block`.
    pub fn update_difficulty(&self, current_difficulty: u64, block_time_delta: u64) {
        let suggestion = expected_difficulty(
            &self.config,
            current_difficulty,
            self.config.retarget_interval,
            block_time_delta.max(1) * self.config.retarget_interval,
        );
        *self.suggested_difficulty.write().unwrap() = suggestion;
    }

    /// Current suggested difficulty for the next block a miner would
    /// build.
    pub fn get_difficulty(&self) -> u64 {
        *self.suggested_difficulty.read().unwrap()
    }

    /// Full header + PoW validation against a known parent. The caller
    /// supplies `now` (wall-clock seconds) and the difficulty expected at
    /// this height (from `expected_difficulty`, using chain history the
    /// engine does not itself own).
    pub fn validate_block(
        &self,
        block: &Block,
        parent: &BlockHeader,
        now: i64,
        expected_diff: u64,
        is_genesis: bool,
    ) -> CoreResult<()> {
        self.validate_header_well_formed(&block.header)?;

        let recomputed_root = block.compute_merkle_root();
        if recomputed_root != block.header.merkle_root {
            return Err(CoreError::InvalidMerkleRoot);
        }

        if !is_genesis && block.header.difficulty != expected_diff {
            return Err(CoreError::InvalidDifficulty {
                expected: expected_diff,
                actual: block.header.difficulty,
            });
        }

        if !self.validate_proof_of_work(block) {
            return Err(CoreError::InvalidProofOfWork);
        }

        if block.header.timestamp < parent.timestamp {
            return Err(CoreError::TimestampRegression {
                timestamp: block.header.timestamp,
                parent_timestamp: parent.timestamp,
            });
        }

        let limit = now.saturating_add(self.config.future_timestamp_tolerance as i64);
        if block.header.timestamp > limit {
            return Err(CoreError::TimestampTooFarFuture {
                timestamp: block.header.timestamp,
                limit,
            });
        }

        Ok(())
    }

    fn validate_header_well_formed(&self, header: &BlockHeader) -> CoreResult<()> {
        if header.version < 1 {
            return Err(CoreError::InvalidInput("header version must be >= 1".into()));
        }
        if header.difficulty == 0 {
            return Err(CoreError::InvalidInput("difficulty must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::Block;

    fn engine() -> ConsensusEngine {
        ConsensusEngine::new(Config::default().into())
    }

    #[test]
    fn target_shrinks_as_difficulty_grows() {
        let low = ConsensusEngine::target_for_difficulty(1).unwrap();
        let high = ConsensusEngine::target_for_difficulty(8).unwrap();
        assert!(high < low);
    }

    #[test]
    fn zero_difficulty_has_no_target() {
        assert!(ConsensusEngine::target_for_difficulty(0).is_none());
    }

    #[test]
    fn genesis_difficulty_one_satisfies_its_own_target_with_overwhelming_probability() {
        let cfg = Config::default();
        let genesis = Block::genesis(&cfg);
        let e = engine();
        let target = ConsensusEngine::target_for_difficulty(1).unwrap();
        assert_eq!(target, BigUint::one() << 255u32);
        let result = e.validate_proof_of_work(&genesis);
        let _ = result;
    }

    #[test]
    fn rejects_stale_version() {
        let cfg = Config::default();
        let mut genesis = Block::genesis(&cfg);
        genesis.header.version = 0;
        let e = engine();
        let err = e.validate_header_well_formed(&genesis.header).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn timestamp_too_far_future_is_rejected() {
        let cfg = Config::default();
        let mut block = Block::genesis(&cfg);
        block.header.timestamp = 1_231_006_505 + 100_000;
        let e = engine();
        let err = e
            .validate_block(&block, &Block::genesis(&cfg).header, 1_231_006_505, 1, true)
            .unwrap_err();
        assert!(matches!(err, CoreError::TimestampTooFarFuture { .. }));
    }
}
