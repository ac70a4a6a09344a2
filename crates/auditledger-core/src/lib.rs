//! # auditledger-core
//!
//! The write side of the tamper-evident audit ledger.
//!
//! This crate provides:
//! - The three collaborator traits (`DurableAuditStore`, `ChainStore`, `Miner`)
//! - `ProofOfWorkMiner`, the reference `Miner`
//! - `LedgerConfig`, loaded from TOML
//! - The `Ledger`, which batches entries and seals them into blocks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use auditledger_core::{Ledger, LedgerConfig, ProofOfWorkMiner};
//!
//! let ledger = Ledger::with_proof_of_work(config, store, Box::new(chain_store))?;
//! ledger.initialize()?;
//! let tx_hash = ledger.record_event(request)?;
//! ```

pub mod config;
pub mod ledger;
pub mod miner;
pub mod traits;

pub use config::LedgerConfig;
pub use ledger::Ledger;
pub use miner::ProofOfWorkMiner;

// ── Tests ─────────────────────────────────────────────────────────────────────
