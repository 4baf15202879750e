//! Transaction, input, output, and outpoint types, with canonical
//! big-endian encoding for hashing.

use serde::{Deserialize, Serialize};

use crate::hash::{sha256, Hash256};

/// Uniquely identifies one transaction output: the transaction that
/// created it, and the output's position within that transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_hash: Hash256,
    pub output_index: u32,
}

/// One spend of a prior output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub prev_tx_hash: Hash256,
    pub prev_tx_index: u32,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxInput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            tx_hash: self.prev_tx_hash,
            output_index: self.prev_tx_index,
        }
    }
}

/// One newly created, spendable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// A transfer of value: an ordered list of inputs spent and outputs
/// created. A transaction with no inputs is a coinbase, and must be the
/// first transaction in its block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u64,
    pub fee: u64,
}

impl Transaction {
    /// A coinbase transaction has no inputs.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Canonical byte encoding used for hashing: version(4, BE) | for each
    /// input { prev_tx_hash(32) | prev_tx_index(4, BE) | script_sig bytes |
    /// sequence(4, BE) } | for each output { value(8, BE) | script_pubkey
    /// bytes } | lock_time(8, BE) | fee(8, BE).
    pub fn canonical_encoding(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version.to_be_bytes());
        for input in &self.inputs {
            buf.extend_from_slice(&input.prev_tx_hash);
            buf.extend_from_slice(&input.prev_tx_index.to_be_bytes());
            buf.extend_from_slice(&input.script_sig);
            buf.extend_from_slice(&input.sequence.to_be_bytes());
        }
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.to_be_bytes());
            buf.extend_from_slice(&output.script_pubkey);
        }
        buf.extend_from_slice(&self.lock_time.to_be_bytes());
        buf.extend_from_slice(&self.fee.to_be_bytes());
        buf
    }

    /// Transaction hash: single SHA-256 of the canonical encoding.
    pub fn hash(&self) -> Hash256 {
        sha256(&self.canonical_encoding())
    }

    /// Sum of this transaction's output values. `None` on overflow.
    pub fn output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }
}

/// An entry in the UTXO set: what an unspent outpoint is worth, the
/// script guarding it, the height it was created at, and whether it came
/// from a coinbase (subject to maturity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
    pub height: u64,
    pub is_coinbase: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_output(value: u64) -> TxOutput {
        TxOutput {
            value,
            script_pubkey: b"script".to_vec(),
        }
    }

    #[test]
    fn coinbase_has_no_inputs() {
        let tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![sample_output(50)],
            lock_time: 0,
            fee: 0,
        };
        assert!(tx.is_coinbase());
    }

    #[test]
    fn non_coinbase_has_inputs() {
        let tx = Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_tx_hash: [1u8; 32],
                prev_tx_index: 0,
                script_sig: vec![],
                sequence: 0,
            }],
            outputs: vec![sample_output(10)],
            lock_time: 0,
            fee: 0,
        };
        assert!(!tx.is_coinbase());
    }

    #[test]
    fn hash_is_stable_and_sensitive_to_fields() {
        let tx_a = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![sample_output(50)],
            lock_time: 0,
            fee: 0,
        };
        let mut tx_b = tx_a.clone();
        tx_b.lock_time = 1;
        assert_eq!(tx_a.hash(), tx_a.hash());
        assert_ne!(tx_a.hash(), tx_b.hash());
    }

    #[test]
    fn output_value_overflows_to_none() {
        let tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![sample_output(u64::MAX), sample_output(1)],
            lock_time: 0,
            fee: 0,
        };
        assert_eq!(tx.output_value(), None);
    }

    #[test]
    fn encoding_is_length_disambiguated_by_field_order() {
        let tx = Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_tx_hash: [2u8; 32],
                prev_tx_index: 7,
                script_sig: vec![9, 9],
                sequence: 0xffff_ffff,
            }],
            outputs: vec![sample_output(42)],
            lock_time: 100,
            fee: 1,
        };
        let encoded = tx.canonical_encoding();
        assert_eq!(&encoded[0..4], &1u32.to_be_bytes());
    }
}
