//! Trait seams between the ledger and its collaborators.
//!
//! - `DurableAuditStore`: the external system of record for audit rows
//! - `ChainStore`: where sealed blocks are persisted across restarts
//! - `Miner`: seals a candidate block under a difficulty target
//!
//! The ledger never assumes the durable store and the chain store commit
//! together: a row can be durable without its entry being sealed yet.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use auditledger_contracts::{
    block::{Block, CandidateBlock},
    error::LedgerResult,
    row::AuditRow,
};

/// The system of record for individual audit rows.
///
/// All time ranges are half-open: `start <= timestamp < end`.
pub trait DurableAuditStore: Send + Sync {
    /// Persist a new row and return it with its assigned `id`.
    fn save(&self, row: AuditRow) -> LedgerResult<AuditRow>;

    /// Record the transaction hash of a row whose entry has been sealed.
    fn attach_chain_hash(&self, row_id: u64, transaction_hash: &str) -> LedgerResult<()>;

    fn find_by_id(&self, row_id: u64) -> LedgerResult<Option<AuditRow>>;

    fn find_by_chain_hash(&self, transaction_hash: &str) -> LedgerResult<Option<AuditRow>>;

    fn find_by_entry_id(&self, entry_id: Uuid) -> LedgerResult<Option<AuditRow>>;

    /// Rows with no chain hash attached, ordered by ascending `id`.
    fn find_unsealed(&self) -> LedgerResult<Vec<AuditRow>>;

    fn find_by_entity_and_time_range(
        &self,
        entity_type: &str,
        entity_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<Vec<AuditRow>>;

    fn find_by_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> LedgerResult<Vec<AuditRow>>;
}

/// Append-only persistence for sealed blocks.
pub trait ChainStore: Send + Sync {
    /// Load every persisted block in exact append order.
    fn load(&self) -> LedgerResult<Vec<Block>>;

    /// Durably append one sealed block.
    fn append(&self, block: &Block) -> LedgerResult<()>;
}

/// Finds a nonce that makes a block's hash satisfy the difficulty target.
pub trait Miner: Send + Sync {
    /// Seal `candidate` so its hash starts with `difficulty` `'0'` characters.
    ///
    /// Must be deterministic: identical candidates and difficulty yield the
    /// same nonce and hash.
    fn mine(&self, candidate: CandidateBlock, difficulty: usize) -> LedgerResult<Block>;
}
