//! Canonical hashing primitives shared by block and transaction encodings.

use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 digest, used for block hashes, transaction hashes,
/// and Merkle nodes alike.
pub type Hash256 = [u8; 32];

/// The all-zero hash, used as the genesis block's `prev_block_hash` and
/// as the Merkle root of an empty transaction list.
pub const ZERO_HASH: Hash256 = [0u8; 32];

/// Single SHA-256 over an arbitrary byte buffer.
pub fn sha256(data: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Interpret a 32-byte hash as a big-endian 256-bit unsigned integer for
/// proof-of-work target comparison.
pub fn hash_as_uint(hash: &Hash256) -> num_bigint::BigUint {
    num_bigint::BigUint::from_bytes_be(hash)
}
