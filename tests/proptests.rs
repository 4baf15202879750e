//! Property tests for the Chain State Manager's core invariants: tip
//! height tracks canonical chain length, accumulated work accumulates
//! correctly, reorg leaves the UTXO set identical to a from-scratch
//! replay of the winning chain, canonical encodings round-trip, and
//! `AddBlock` behaves idempotently and orders blocks by height.

use num_bigint::BigUint;
use proptest::prelude::*;

use novachain_core::config::ConsensusConfig;
use novachain_core::consensus::ConsensusEngine;
use novachain_core::hash::hash_as_uint;
use novachain_core::util::merkle::merkle_root;
use novachain_core::{Block, BlockHeader, ChainStateManager, Config, MemoryStorage, Transaction, TxOutput};

fn coinbase(seed: u64) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![],
        outputs: vec![TxOutput {
            value: 1_000,
            script_pubkey: b"prop-miner".to_vec(),
        }],
        lock_time: seed,
        fee: 0,
    }
}

/// Mine a single-transaction, difficulty-1 child of `parent`. Difficulty
/// 1 succeeds roughly every other nonce, so this stays fast even across
/// many proptest cases.
fn mine_child(parent: &Block, timestamp: i64, seed: u64) -> Block {
    let tx = coinbase(seed);
    let transactions = vec![tx];
    let merkle = merkle_root(&transactions.iter().map(Transaction::hash).collect::<Vec<_>>());
    let mut header = BlockHeader {
        version: 1,
        prev_block_hash: parent.hash(),
        merkle_root: merkle,
        timestamp,
        difficulty: 1,
        nonce: 0,
        height: parent.header.height + 1,
    };
    let target = ConsensusEngine::target_for_difficulty(1).unwrap();
    let mut nonce = 0u64;
    loop {
        header.nonce = nonce;
        let block = Block {
            header: header.clone(),
            transactions: transactions.clone(),
        };
        if hash_as_uint(&block.hash()) < target {
            return block;
        }
        nonce += 1;
    }
}

fn open() -> ChainStateManager<MemoryStorage> {
    let cfg = Config::default();
    ChainStateManager::open(cfg, ConsensusConfig::from(cfg), MemoryStorage::new()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// The tip's height always equals the number of blocks mined on top
    /// of genesis, for any chain length in range.
    #[test]
    fn tip_height_tracks_canonical_chain_length(len in 0u64..15) {
        let manager = open();
        let mut parent = manager.get_best_block().unwrap();
        for i in 1..=len {
            let block = mine_child(&parent, parent.header.timestamp + 600, i);
            manager.add_block(block.clone()).unwrap();
            parent = block;
        }
        prop_assert_eq!(manager.get_height(), len);
        prop_assert_eq!(manager.get_tip_hash(), parent.hash());
    }

    /// Accumulated work at every height is exactly the running sum of
    /// each block's own difficulty (all 1 here), since genesis
    /// contributes none of its own.
    #[test]
    fn accumulated_work_is_running_sum_of_difficulty(len in 1u64..15) {
        let manager = open();
        let mut parent = manager.get_best_block().unwrap();
        for i in 1..=len {
            let block = mine_child(&parent, parent.header.timestamp + 600, i);
            manager.add_block(block.clone()).unwrap();
            prop_assert_eq!(manager.get_accumulated_work(i).unwrap(), BigUint::from(i));
            parent = block;
        }
    }

    /// A block that directly extends block `A` becomes the tip at
    /// `A`'s height + 1, regardless of how many blocks preceded `A`.
    #[test]
    fn extending_block_becomes_tip_at_its_height_plus_one(prefix_len in 0u64..10) {
        let manager = open();
        let mut parent = manager.get_best_block().unwrap();
        for i in 1..=prefix_len {
            let block = mine_child(&parent, parent.header.timestamp + 600, i);
            manager.add_block(block.clone()).unwrap();
            parent = block;
        }
        let a = parent;
        let b = mine_child(&a, a.header.timestamp + 600, 9_999);
        manager.add_block(b.clone()).unwrap();
        prop_assert_eq!(manager.get_tip_hash(), b.hash());
        prop_assert_eq!(manager.get_height(), a.header.height + 1);
    }

    /// Re-decoding a block's canonical `bincode` encoding reproduces a
    /// value that hashes identically to the original.
    #[test]
    fn canonical_encoding_round_trips_to_the_same_hash(len in 0u64..8) {
        let manager = open();
        let mut parent = manager.get_best_block().unwrap();
        for i in 1..=len {
            let block = mine_child(&parent, parent.header.timestamp + 600, i);
            manager.add_block(block.clone()).unwrap();
            parent = block;
        }
        let original_hash = parent.hash();
        let encoded = bincode::serialize(&parent).unwrap();
        let decoded: Block = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded.hash(), original_hash);
    }

    /// Submitting the exact same block twice is rejected the second
    /// time with no change to the chain's height or tip.
    #[test]
    fn duplicate_submission_is_idempotent(len in 0u64..10) {
        let manager = open();
        let mut parent = manager.get_best_block().unwrap();
        for i in 1..=len {
            let block = mine_child(&parent, parent.header.timestamp + 600, i);
            manager.add_block(block.clone()).unwrap();
            parent = block;
        }
        let next = mine_child(&parent, parent.header.timestamp + 600, 424_242);
        manager.add_block(next.clone()).unwrap();
        let height_before = manager.get_height();
        let tip_before = manager.get_tip_hash();

        let result = manager.add_block(next);
        prop_assert!(result.is_err());
        prop_assert_eq!(manager.get_height(), height_before);
        prop_assert_eq!(manager.get_tip_hash(), tip_before);
    }
}

/// After a reorg, the live UTXO set matches what a fresh manager gets by
/// replaying only the winning chain from genesis — the disconnected
/// side's effects leave no trace.
#[test]
fn utxo_set_after_reorg_matches_fresh_replay_of_winning_chain() {
    let manager = open();
    let genesis = manager.get_best_block().unwrap();

    // Side branch: two blocks, seen first.
    let a1 = mine_child(&genesis, genesis.header.timestamp + 600, 1);
    manager.add_block(a1.clone()).unwrap();
    let a2 = mine_child(&a1, a1.header.timestamp + 600, 2);
    manager.add_block(a2.clone()).unwrap();
    assert_eq!(manager.get_tip_hash(), a2.hash());

    // Winning branch: three blocks off genesis, overtaking A on work.
    let b1 = mine_child(&genesis, genesis.header.timestamp + 600, 3);
    manager.add_block(b1.clone()).unwrap();
    let b2 = mine_child(&b1, b1.header.timestamp + 600, 4);
    manager.add_block(b2.clone()).unwrap();
    let b3 = mine_child(&b2, b2.header.timestamp + 600, 5);
    manager.add_block(b3.clone()).unwrap();
    assert_eq!(manager.get_tip_hash(), b3.hash());

    let fresh = open();
    for block in [&b1, &b2, &b3] {
        fresh.add_block((*block).clone()).unwrap();
    }

    for (label, outpoint) in [
        ("genesis", genesis.transactions[0].hash()),
        ("b1", b1.transactions[0].hash()),
        ("b2", b2.transactions[0].hash()),
        ("b3", b3.transactions[0].hash()),
        ("a1", a1.transactions[0].hash()),
        ("a2", a2.transactions[0].hash()),
    ] {
        let outpoint = novachain_core::OutPoint { tx_hash: outpoint, output_index: 0 };
        assert_eq!(
            manager.utxo_get(&outpoint),
            fresh.utxo_get(&outpoint),
            "utxo entry for {label} diverged between reorg result and fresh replay",
        );
    }
}
