//! Verification result documents.
//!
//! These are answers, not errors: a tampered chain yields a
//! `ChainVerification` with `valid = false`, and a diverging durable row
//! yields an `EntryVerification` with `data_matches = false`.

use serde::{Deserialize, Serialize};

/// Why a block failed chain verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockFailureKind {
    /// The stored hash differs from the hash recomputed from the block's fields.
    HashMismatch { stored: String, recomputed: String },
    /// `previous_hash` does not equal the preceding block's hash.
    BrokenLink { expected: String, found: String },
    /// The block's index is not its position in the chain.
    IndexOutOfSequence { expected: u64, found: u64 },
    /// The hash lacks the required run of leading `'0'` characters.
    DifficultyNotMet { difficulty: usize, hash: String },
    /// Block 0 does not carry the genesis sentinel.
    BadGenesis { previous_hash: String },
}

/// The first block that failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFailure {
    pub index: u64,
    pub failure: BlockFailureKind,
}

/// Outcome of walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    /// True only if every checked block passed.
    pub valid: bool,
    /// Blocks examined before stopping (all of them when valid).
    pub blocks_checked: usize,
    /// The first offending block, if any.
    pub failure: Option<BlockFailure>,
}

impl ChainVerification {
    pub fn first_failed_block(&self) -> Option<u64> {
        self.failure.as_ref().map(|f| f.index)
    }
}

/// Outcome of checking one durable row against the chain.
///
/// The booleans are independent. `transaction_found = false` means the row
/// is unverifiable (not sealed yet), which is not evidence of tampering.
/// `row_linked = false` means the durable row does not carry the chain hash
/// (or no durable row exists); that is a linkage gap, also not tampering.
/// Only a present row whose fields differ from the sealed entry, shown by a
/// non-empty `mismatched_fields`, indicates tampering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryVerification {
    pub chain_valid: bool,
    pub transaction_found: bool,
    /// True when a durable row exists and its fields equal the sealed entry.
    pub data_matches: bool,
    /// True when the durable row's `chain_hash` points at the sealed entry.
    pub row_linked: bool,
    pub row_id: Option<u64>,
    pub transaction_hash: Option<String>,
    /// Index of the block holding the entry, when found.
    pub block_index: Option<u64>,
    /// Names of the fields whose durable copy differs from the chain copy.
    pub mismatched_fields: Vec<String>,
}
