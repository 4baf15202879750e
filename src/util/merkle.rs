//! Merkle tree construction over transaction hashes.
//!
//! Odd node counts are handled by duplicating the last node at that
//! level, at every level of the tree (not just the leaves), so each
//! level always halves cleanly.

use crate::hash::{sha256, Hash256, ZERO_HASH};

/// Combine two child hashes into their parent via a single SHA-256 over
/// their concatenation.
fn hash_pair(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(left);
    buf.extend_from_slice(right);
    sha256(&buf)
}

/// Compute the Merkle root over an ordered list of leaf hashes. An empty
/// list yields the all-zero root.
pub fn merkle_root(leaves: &[Hash256]) -> Hash256 {
    if leaves.is_empty() {
        return ZERO_HASH;
    }

    let mut level: Vec<Hash256> = leaves.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = *level.last().unwrap();
            level.push(last);
        }
        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks_exact(2) {
            next.push(hash_pair(&pair[0], &pair[1]));
        }
        level = next;
    }
    level[0]
}
