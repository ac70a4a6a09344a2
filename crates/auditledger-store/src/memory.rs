//! In-memory implementations of the store traits.
//!
//! `InMemoryAuditStore` is the reference `DurableAuditStore`: rows live in a
//! `Vec` behind a `Mutex`, ids are assigned sequentially from 1.
//! `InMemoryChainStore` keeps sealed blocks for the life of the process.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use auditledger_contracts::{
    block::Block,
    error::{LedgerError, LedgerResult},
    row::AuditRow,
};
use auditledger_core::traits::{ChainStore, DurableAuditStore};

fn poisoned<E: std::fmt::Display>(what: &str, e: E) -> LedgerError {
    LedgerError::Persistence {
        reason: format!("{} lock poisoned: {}", what, e),
    }
}

fn in_range(row: &AuditRow, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    row.timestamp >= start && row.timestamp < end
}

// ── Durable audit rows ────────────────────────────────────────────────────────

struct RowState {
    rows: Vec<AuditRow>,
    next_id: u64,
}

/// A `DurableAuditStore` held entirely in memory.
///
/// Cloning shares the underlying rows.
#[derive(Clone)]
pub struct InMemoryAuditStore {
    state: Arc<Mutex<RowState>>,
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RowState {
                rows: Vec::new(),
                next_id: 1,
            })),
        }
    }

    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.lock()?.rows.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.lock()?.rows.is_empty())
    }

    /// Replace a stored row wholesale, bypassing the ledger.
    ///
    /// This is what an out-of-band edit to the system of record looks like;
    /// tamper drills use it to show that `verify_entry` catches the change.
    pub fn overwrite(&self, row: AuditRow) -> LedgerResult<()> {
        let id = row.id.ok_or_else(|| LedgerError::Validation {
            reason: "cannot overwrite a row without an id".to_string(),
        })?;
        let mut state = self.lock()?;
        let slot = state
            .rows
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or_else(|| LedgerError::NotFound {
                what: format!("audit row {}", id),
            })?;
        *slot = row;
        Ok(())
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, RowState>> {
        self.state.lock().map_err(|e| poisoned("audit store", e))
    }
}

impl DurableAuditStore for InMemoryAuditStore {
    fn save(&self, mut row: AuditRow) -> LedgerResult<AuditRow> {
        let mut state = self.lock()?;
        let id = state.next_id;
        state.next_id += 1;
        row.id = Some(id);
        state.rows.push(row.clone());
        debug!(row_id = id, event_type = %row.event_type, "audit row saved");
        Ok(row)
    }

    fn attach_chain_hash(&self, row_id: u64, transaction_hash: &str) -> LedgerResult<()> {
        let mut state = self.lock()?;
        let row = state
            .rows
            .iter_mut()
            .find(|r| r.id == Some(row_id))
            .ok_or_else(|| LedgerError::NotFound {
                what: format!("audit row {}", row_id),
            })?;
        row.chain_hash = Some(transaction_hash.to_string());
        Ok(())
    }

    fn find_by_id(&self, row_id: u64) -> LedgerResult<Option<AuditRow>> {
        Ok(self.lock()?.rows.iter().find(|r| r.id == Some(row_id)).cloned())
    }

    fn find_by_chain_hash(&self, transaction_hash: &str) -> LedgerResult<Option<AuditRow>> {
        Ok(self
            .lock()?
            .rows
            .iter()
            .find(|r| r.chain_hash.as_deref() == Some(transaction_hash))
            .cloned())
    }

    fn find_by_entry_id(&self, entry_id: Uuid) -> LedgerResult<Option<AuditRow>> {
        Ok(self.lock()?.rows.iter().find(|r| r.entry_id == entry_id).cloned())
    }

    // Rows are stored in id order.
    fn find_unsealed(&self) -> LedgerResult<Vec<AuditRow>> {
        Ok(self
            .lock()?
            .rows
            .iter()
            .filter(|r| r.chain_hash.is_none())
            .cloned()
            .collect())
    }

    fn find_by_entity_and_time_range(
        &self,
        entity_type: &str,
        entity_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<Vec<AuditRow>> {
        Ok(self
            .lock()?
            .rows
            .iter()
            .filter(|r| r.entity_type == entity_type && r.entity_id == entity_id && in_range(r, start, end))
            .cloned()
            .collect())
    }

    fn find_by_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> LedgerResult<Vec<AuditRow>> {
        Ok(self
            .lock()?
            .rows
            .iter()
            .filter(|r| in_range(r, start, end))
            .cloned()
            .collect())
    }
}

// ── Sealed blocks ─────────────────────────────────────────────────────────────

/// A `ChainStore` that keeps blocks in memory. Cloning shares the blocks, so
/// a second ledger built on a clone sees a "restart" with the same chain.
#[derive(Clone, Default)]
pub struct InMemoryChainStore {
    blocks: Arc<Mutex<Vec<Block>>>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a persisted block, bypassing the ledger. Used by tamper drills
    /// against the chain's backing storage.
    pub fn overwrite(&self, block: Block) -> LedgerResult<()> {
        let mut blocks = self.blocks.lock().map_err(|e| poisoned("chain store", e))?;
        let slot = usize::try_from(block.index)
            .ok()
            .and_then(|i| blocks.get_mut(i))
            .ok_or_else(|| LedgerError::NotFound {
                what: format!("block {}", block.index),
            })?;
        *slot = block;
        Ok(())
    }
}

impl ChainStore for InMemoryChainStore {
    fn load(&self) -> LedgerResult<Vec<Block>> {
        Ok(self.blocks.lock().map_err(|e| poisoned("chain store", e))?.clone())
    }

    fn append(&self, block: &Block) -> LedgerResult<()> {
        self.blocks
            .lock()
            .map_err(|e| poisoned("chain store", e))?
            .push(block.clone());
        Ok(())
    }
}
