//! Chain-walk and entry-level integrity checks.
//!
//! Chain rules, checked per block in this order (first failure wins):
//!
//! 1. **Position**: `index` equals the block's position in the chain.
//! 2. **Linkage**: block 0 carries the genesis sentinel; every later block's
//!    `previous_hash` equals the preceding block's stored `hash`.
//! 3. **Hash correctness**: the stored `hash` equals the hash recomputed
//!    from the block's own fields.
//! 4. **Difficulty**: the stored `hash` has the configured leading zeros.
//!
//! Entry checks compare a durable row field by field against the entry the
//! chain holds under the row's transaction hash. A row whose hash was never
//! attached is matched by entry id instead and reported as unlinked. A
//! mismatch is reported, not raised; only infrastructure failures are errors.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use auditledger_chain::{hash_block, hash_entry, meets_difficulty};
use auditledger_contracts::{
    block::{Block, GENESIS_PREVIOUS_HASH},
    entry::AuditEntry,
    error::{LedgerError, LedgerResult},
    report::ChainIntegritySummary,
    row::AuditRow,
    verify::{BlockFailure, BlockFailureKind, ChainVerification, EntryVerification},
};
use auditledger_core::Ledger;

/// Walk `blocks` and report the first block that breaks a chain rule.
///
/// An empty slice is valid. Pure: reads only its arguments.
pub fn verify_blocks(blocks: &[Block], difficulty: usize) -> ChainVerification {
    let mut prev_hash: Option<&str> = None;

    for (position, block) in blocks.iter().enumerate() {
        if let Some(failure) = check_block(position as u64, block, prev_hash, difficulty) {
            return ChainVerification {
                valid: false,
                blocks_checked: position + 1,
                failure: Some(BlockFailure {
                    index: position as u64,
                    failure,
                }),
            };
        }
        prev_hash = Some(block.hash.as_str());
    }

    ChainVerification {
        valid: true,
        blocks_checked: blocks.len(),
        failure: None,
    }
}

fn check_block(
    position: u64,
    block: &Block,
    prev_hash: Option<&str>,
    difficulty: usize,
) -> Option<BlockFailureKind> {
    if block.index != position {
        return Some(BlockFailureKind::IndexOutOfSequence {
            expected: position,
            found: block.index,
        });
    }

    match prev_hash {
        None if block.previous_hash != GENESIS_PREVIOUS_HASH => {
            return Some(BlockFailureKind::BadGenesis {
                previous_hash: block.previous_hash.clone(),
            });
        }
        Some(expected) if block.previous_hash != expected => {
            return Some(BlockFailureKind::BrokenLink {
                expected: expected.to_string(),
                found: block.previous_hash.clone(),
            });
        }
        _ => {}
    }

    let recomputed = hash_block(block);
    if recomputed != block.hash {
        return Some(BlockFailureKind::HashMismatch {
            stored: block.hash.clone(),
            recomputed,
        });
    }

    if !meets_difficulty(&block.hash, difficulty) {
        return Some(BlockFailureKind::DifficultyNotMet {
            difficulty,
            hash: block.hash.clone(),
        });
    }

    None
}

/// Names of the fields where `row` diverges from `entry`.
pub fn mismatched_fields(row: &AuditRow, entry: &AuditEntry) -> Vec<String> {
    fn ts(t: &DateTime<Utc>) -> String {
        t.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    let checks: [(&str, bool); 12] = [
        ("entry_id", row.entry_id == entry.id),
        ("timestamp", ts(&row.timestamp) == ts(&entry.timestamp)),
        ("event_type", row.event_type == entry.event_type),
        ("entity_type", row.entity_type == entry.entity_type),
        ("entity_id", row.entity_id == entry.entity_id),
        ("user_id", row.user_id == entry.user_id),
        ("action", row.action == entry.action),
        ("details", row.details == entry.details),
        ("ip_address", row.client.ip_address == entry.client.ip_address),
        ("user_agent", row.client.user_agent == entry.client.user_agent),
        ("session_id", row.client.session_id == entry.client.session_id),
        ("correlation_id", row.client.correlation_id == entry.client.correlation_id),
    ];

    checks
        .iter()
        .filter(|(_, same)| !same)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Every committed entry, keyed by transaction hash and by entry id.
#[derive(Default)]
struct EntryIndex {
    by_hash: HashMap<String, (u64, AuditEntry)>,
    by_entry_id: HashMap<Uuid, String>,
}

impl EntryIndex {
    fn build(blocks: &[Block]) -> Self {
        let mut index = Self::default();
        for block in blocks {
            for entry in &block.entries {
                let transaction_hash = hash_entry(entry);
                index.by_entry_id.insert(entry.id, transaction_hash.clone());
                index.by_hash.insert(transaction_hash, (block.index, entry.clone()));
            }
        }
        index
    }

    fn locate_by_entry_id(&self, entry_id: &Uuid) -> Option<(&str, &(u64, AuditEntry))> {
        let transaction_hash = self.by_entry_id.get(entry_id)?;
        self.by_hash
            .get(transaction_hash)
            .map(|located| (transaction_hash.as_str(), located))
    }
}

/// Integrity checks against a live ledger and its durable store.
///
/// Every check works on a snapshot of the chain taken at call time, so a
/// block being mined concurrently is either fully visible or not at all.
pub struct IntegrityVerifier {
    ledger: Arc<Ledger>,
}

impl IntegrityVerifier {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Walk the whole committed chain.
    pub fn verify_chain(&self) -> LedgerResult<ChainVerification> {
        let blocks = self.ledger.snapshot()?;
        let result = verify_blocks(&blocks, self.ledger.difficulty());
        log_chain_result(&result);
        Ok(result)
    }

    /// Verify the chain through the last block created in `[start, end)`.
    ///
    /// Earlier blocks are included because linkage can only be checked from
    /// genesis forward; later blocks are not examined.
    pub fn verify_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> LedgerResult<ChainIntegritySummary> {
        let blocks = self.ledger.snapshot()?;
        let in_period: Vec<usize> = blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.timestamp >= start && b.timestamp < end)
            .map(|(i, _)| i)
            .collect();

        let through = in_period.last().map(|&i| i + 1).unwrap_or(0);
        let verification = verify_blocks(&blocks[..through], self.ledger.difficulty());
        log_chain_result(&verification);

        Ok(ChainIntegritySummary {
            chain_valid: verification.valid,
            total_blocks: blocks.len(),
            blocks_in_period: in_period.len(),
            first_failed_block: verification.first_failed_block(),
            verification,
        })
    }

    /// Check one durable row against the chain.
    pub fn verify_entry(&self, row: &AuditRow) -> LedgerResult<EntryVerification> {
        let blocks = self.ledger.snapshot()?;
        let chain_valid = verify_blocks(&blocks, self.ledger.difficulty()).valid;
        let index = EntryIndex::build(&blocks);
        Ok(check_row(row, chain_valid, &index))
    }

    /// Check many rows, walking the chain and indexing its entries once.
    pub fn verify_entries(&self, rows: &[AuditRow]) -> LedgerResult<Vec<EntryVerification>> {
        let blocks = self.ledger.snapshot()?;
        let chain_valid = verify_blocks(&blocks, self.ledger.difficulty()).valid;
        let index = EntryIndex::build(&blocks);
        Ok(rows.iter().map(|row| check_row(row, chain_valid, &index)).collect())
    }

    /// Look a row up in the durable store and check it.
    pub fn verify_row(&self, row_id: u64) -> LedgerResult<EntryVerification> {
        let row = self
            .ledger
            .store()
            .find_by_id(row_id)?
            .ok_or_else(|| LedgerError::NotFound {
                what: format!("audit row {}", row_id),
            })?;
        self.verify_entry(&row)
    }

    /// Check the entry behind a transaction hash.
    ///
    /// A pending (not yet sealed) hash yields an unverifiable result; a hash
    /// that is neither committed nor pending is `NotFound`. When no row
    /// carries the hash, the row saved for the same entry id is checked and
    /// reported with `row_linked = false`. A committed entry with no durable
    /// row at all reports `data_matches = false` and no `row_id`.
    pub fn verify_transaction(&self, transaction_hash: &str) -> LedgerResult<EntryVerification> {
        let Some((block_index, entry)) = self.ledger.locate_entry(transaction_hash)? else {
            if self.ledger.is_pending(transaction_hash)? {
                debug!(transaction_hash = %transaction_hash, "transaction not sealed yet");
                return Ok(EntryVerification {
                    chain_valid: self.verify_chain()?.valid,
                    transaction_found: false,
                    data_matches: false,
                    row_linked: false,
                    row_id: None,
                    transaction_hash: Some(transaction_hash.to_string()),
                    block_index: None,
                    mismatched_fields: Vec::new(),
                });
            }
            return Err(LedgerError::NotFound {
                what: format!("transaction {}", transaction_hash),
            });
        };

        let store = self.ledger.store();
        if let Some(row) = store.find_by_chain_hash(transaction_hash)? {
            return self.verify_entry(&row);
        }
        if let Some(row) = store.find_by_entry_id(entry.id)? {
            debug!(
                transaction_hash = %transaction_hash,
                row_id = ?row.id,
                "sealed entry's audit row has no chain hash; matching by entry id"
            );
            return self.verify_entry(&row);
        }

        warn!(transaction_hash = %transaction_hash, "sealed entry has no durable audit row");
        Ok(EntryVerification {
            chain_valid: self.verify_chain()?.valid,
            transaction_found: true,
            data_matches: false,
            row_linked: false,
            row_id: None,
            transaction_hash: Some(transaction_hash.to_string()),
            block_index: Some(block_index),
            mismatched_fields: Vec::new(),
        })
    }
}

fn check_row(row: &AuditRow, chain_valid: bool, index: &EntryIndex) -> EntryVerification {
    let linked = row
        .chain_hash
        .as_deref()
        .and_then(|tx| index.by_hash.get(tx).map(|located| (tx, located)));
    let row_linked = linked.is_some();
    let located = linked.or_else(|| index.locate_by_entry_id(&row.entry_id));

    let (transaction_found, transaction_hash, block_index, mismatched) = match located {
        Some((tx, (block_index, entry))) => (
            true,
            Some(tx.to_string()),
            Some(*block_index),
            mismatched_fields(row, entry),
        ),
        None => (false, row.chain_hash.clone(), None, Vec::new()),
    };
    let data_matches = transaction_found && mismatched.is_empty();

    if transaction_found && !row_linked {
        debug!(row_id = ?row.id, "audit row is sealed but its chain hash is not attached");
    }

    if transaction_found && !data_matches {
        warn!(
            row_id = ?row.id,
            fields = ?mismatched,
            "durable audit row diverges from its sealed entry"
        );
    }

    EntryVerification {
        chain_valid,
        transaction_found,
        data_matches,
        row_linked,
        row_id: row.id,
        transaction_hash,
        block_index,
        mismatched_fields: mismatched,
    }
}

fn log_chain_result(result: &ChainVerification) {
    match &result.failure {
        None => debug!(blocks = result.blocks_checked, "audit chain verified"),
        Some(failure) => warn!(
            index = failure.index,
            failure = ?failure.failure,
            "audit chain tampering detected"
        ),
    }
}
