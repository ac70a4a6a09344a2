//! Block types.
//!
//! A `CandidateBlock` is an unsealed batch of entries with its linkage
//! metadata. Only a `Miner` turns it into a `Block`, which carries the nonce
//! and the solved hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::AuditEntry;

/// The `previous_hash` sentinel carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A batch of entries waiting to be mined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateBlock {
    /// Position the block will take in the chain (0 for genesis).
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    /// Hash of the block this one extends, or `GENESIS_PREVIOUS_HASH`.
    pub previous_hash: String,
    /// Entries in buffer order; this order is the block's transaction order.
    pub entries: Vec<AuditEntry>,
}

impl CandidateBlock {
    /// The unsealed genesis block: index 0, no entries.
    pub fn genesis(timestamp: DateTime<Utc>) -> Self {
        Self {
            index: 0,
            timestamp,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            entries: Vec::new(),
        }
    }

    /// Attach a solved nonce and hash, producing a sealed block.
    pub fn seal(self, nonce: u64, hash: String) -> Block {
        Block {
            index: self.index,
            timestamp: self.timestamp,
            previous_hash: self.previous_hash,
            entries: self.entries,
            nonce,
            hash,
        }
    }
}

/// A mined, hash-sealed block.
///
/// Invariant: `hash` equals the block hash recomputed over
/// (index, timestamp, previous_hash, entries, nonce) and starts with the
/// configured number of `'0'` hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub previous_hash: String,
    pub entries: Vec<AuditEntry>,
    pub nonce: u64,
    /// SHA-256 (lowercase hex) of the block's canonical content.
    pub hash: String,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}
