//! Error taxonomy for the audit ledger.
//!
//! All fallible ledger operations return `LedgerResult<T>`. Detected
//! tampering is deliberately absent from this enum: a failed integrity check
//! is reported through `ChainVerification` / `EntryVerification`, not raised.

use thiserror::Error;

/// The unified error type for the audit ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The submitted event is missing a required field or carries an
    /// unparseable value. Raised before anything is persisted or hashed.
    #[error("invalid audit event: {reason}")]
    Validation { reason: String },

    /// The durable store or chain store could not complete a read or write.
    ///
    /// When raised from `record_event` the event is not considered recorded.
    #[error("persistence failed: {reason}")]
    Persistence { reason: String },

    /// The nonce search gave up before satisfying the difficulty target.
    ///
    /// The pending buffer is left untouched so sealing can be retried.
    #[error("mining failed: {reason}")]
    Mining { reason: String },

    /// A requested transaction hash or audit row does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A configuration value is missing or out of range.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// An operation that needs the chain ran before `Ledger::initialize`.
    #[error("ledger has not been initialized")]
    NotInitialized,

    /// Shared ledger state is unusable (a lock was poisoned by a panic).
    #[error("ledger state corrupted: {reason}")]
    StateCorrupted { reason: String },
}

/// Convenience alias used throughout the ledger crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
