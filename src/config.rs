//! Runtime-tunable parameters for chain state, consensus, and the UTXO set.
//!
//! Mirrors the teacher's `DifficultyAdjustmentConfig` / `ChainStateConfig`
//! pattern: one struct per subsystem's knobs, each with a `Default` impl
//! carrying sane example values, plus a narrower view handed to the
//! Consensus Engine so it only sees what it needs.

/// Full set of configurable parameters for the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Subsidy paid by the genesis coinbase, and the baseline block reward.
    pub genesis_block_reward: u64,
    /// Maximum encoded block size, in bytes.
    pub max_block_size: u64,
    /// Maximum number of blocks a reorganization may disconnect.
    pub max_reorg_depth: u64,
    /// Number of blocks between difficulty retargets.
    pub retarget_interval: u64,
    /// Target time between blocks, in seconds.
    pub target_block_time: u64,
    /// Number of blocks a coinbase output must age before it is spendable.
    pub coinbase_maturity: u64,
    /// Maximum allowed clock skew into the future for a block timestamp.
    pub future_timestamp_tolerance: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            genesis_block_reward: 1_000_000_000,
            max_block_size: 1_000_000,
            max_reorg_depth: 100,
            retarget_interval: 2016,
            target_block_time: 600,
            coinbase_maturity: 100,
            future_timestamp_tolerance: 7200,
        }
    }
}

/// The subset of `Config` the Consensus Engine needs. Constructed from a
/// `Config` so the engine never reaches past its own ownership boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusConfig {
    pub retarget_interval: u64,
    pub target_block_time: u64,
    pub future_timestamp_tolerance: u64,
}

impl From<Config> for ConsensusConfig {
    fn from(cfg: Config) -> Self {
        Self {
            retarget_interval: cfg.retarget_interval,
            target_block_time: cfg.target_block_time,
            future_timestamp_tolerance: cfg.future_timestamp_tolerance,
        }
    }
}

impl From<&Config> for ConsensusConfig {
    fn from(cfg: &Config) -> Self {
        (*cfg).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_examples() {
        let cfg = Config::default();
        assert_eq!(cfg.genesis_block_reward, 1_000_000_000);
        assert_eq!(cfg.max_block_size, 1_000_000);
        assert_eq!(cfg.max_reorg_depth, 100);
        assert_eq!(cfg.retarget_interval, 2016);
        assert_eq!(cfg.target_block_time, 600);
        assert_eq!(cfg.coinbase_maturity, 100);
        assert_eq!(cfg.future_timestamp_tolerance, 7200);
    }

    #[test]
    fn consensus_config_narrows_full_config() {
        let cfg = Config::default();
        let consensus: ConsensusConfig = cfg.into();
        assert_eq!(consensus.retarget_interval, cfg.retarget_interval);
        assert_eq!(consensus.target_block_time, cfg.target_block_time);
    }
}
