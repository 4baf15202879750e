//! Difficulty retargeting.
//!
//! Real retargets happen only at `retarget_interval` block boundaries;
//! between boundaries a block inherits its parent's difficulty. This
//! deliberately replaces a per-block adjustment that would otherwise be
//! driven off a single block's timing, which is too noisy to trust.

use crate::config::ConsensusConfig;

/// Maximum factor by which difficulty may move in either direction
/// during a single retarget, to damp oscillation from a noisy interval.
const MAX_ADJUSTMENT_FACTOR: u64 = 4;

/// Compute the difficulty expected at `height`, given the parent's
/// difficulty and, when this height lands on a retarget boundary, the
/// actual elapsed time (in seconds) over the most recent
/// `retarget_interval` blocks.
///
/// `height` is the height of the block being validated/built, i.e. the
/// parent's height + 1.
pub fn expected_difficulty(
    config: &ConsensusConfig,
    parent_difficulty: u64,
    height: u64,
    actual_interval_secs: u64,
) -> u64 {
    if height == 0 || height % config.retarget_interval != 0 {
        return parent_difficulty;
    }

    let target_interval_secs = config
        .target_block_time
        .saturating_mul(config.retarget_interval);

    retarget(parent_difficulty, target_interval_secs, actual_interval_secs)
}

/// Apply the literal retarget formula `new = old * target / actual`,
/// clamped to at most a 4x change in either direction, and floored at 1
/// (difficulty 0 is never valid for a mined block).
fn retarget(old_difficulty: u64, target_interval_secs: u64, actual_interval_secs: u64) -> u64 {
    let actual = actual_interval_secs.max(1);
    let target = target_interval_secs.max(1);

    let scaled = (old_difficulty as u128 * target as u128) / actual as u128;
    let scaled = scaled.min(u64::MAX as u128) as u64;

    let min_allowed = old_difficulty / MAX_ADJUSTMENT_FACTOR;
    let max_allowed = old_difficulty.saturating_mul(MAX_ADJUSTMENT_FACTOR);

    scaled.clamp(min_allowed.max(1), max_allowed.max(1))
}
