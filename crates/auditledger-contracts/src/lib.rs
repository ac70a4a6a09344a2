//! # auditledger-contracts
//!
//! Shared types, result documents, and the error taxonomy for the
//! tamper-evident audit ledger.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions and error types.

pub mod block;
pub mod entry;
pub mod error;
pub mod report;
pub mod row;
pub mod verify;
