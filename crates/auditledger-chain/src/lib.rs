//! # auditledger-chain
//!
//! The hashing leaf of the audit ledger: SHA-256 over an explicit canonical
//! byte encoding, shared by entry hashing, block hashing, mining and
//! verification.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auditledger_chain::{hash_entry, hash_block, meets_difficulty};
//!
//! let tx_hash = hash_entry(&entry);
//! assert_eq!(hash_block(&block), block.hash);
//! assert!(meets_difficulty(&block.hash, 2));
//! ```

pub mod canonical;
pub mod hash;

pub use hash::{hash_block, hash_entry, meets_difficulty, sha256_hex, BlockHasher};

// ── Tests ─────────────────────────────────────────────────────────────────────
