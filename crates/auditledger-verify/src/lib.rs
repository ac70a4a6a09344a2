//! # auditledger-verify
//!
//! Tamper detection for the audit ledger.
//!
//! [`verify_blocks`] walks any slice of blocks and reports the first one that
//! breaks position, linkage, hash, or difficulty rules.
//! [`IntegrityVerifier`] applies it to a live ledger and also checks durable
//! rows against the entries sealed in the chain.
//!
//! Detected tampering is a successful answer (`valid = false`, or a
//! non-empty `mismatched_fields`), never an `Err`. A sealed row that lacks
//! its chain hash is reported with `row_linked = false`, not as tampering.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auditledger_verify::IntegrityVerifier;
//!
//! let verifier = IntegrityVerifier::new(Arc::clone(&ledger));
//! let chain = verifier.verify_chain()?;
//! let entry = verifier.verify_row(row_id)?;
//! ```

pub mod engine;

pub use engine::{mismatched_fields, verify_blocks, IntegrityVerifier};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, Utc};
    use uuid::Uuid;

    use auditledger_contracts::{
        block::CandidateBlock,
        entry::{ClientContext, EventRequest},
        error::{LedgerError, LedgerResult},
        row::AuditRow,
        verify::BlockFailureKind,
    };
    use auditledger_core::{
        traits::{DurableAuditStore, Miner},
        Ledger, LedgerConfig, ProofOfWorkMiner,
    };
    use auditledger_store::{InMemoryAuditStore, InMemoryChainStore};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    struct Fixture {
        ledger: Arc<Ledger>,
        store: InMemoryAuditStore,
        chain: InMemoryChainStore,
        verifier: IntegrityVerifier,
    }

    fn fixture_on(chain: InMemoryChainStore, store: InMemoryAuditStore, block_size: usize, difficulty: usize) -> Fixture {
        let config = LedgerConfig {
            block_size,
            difficulty,
            ..Default::default()
        };
        let ledger = Arc::new(
            Ledger::new(
                config,
                Arc::new(store.clone()),
                Box::new(chain.clone()),
                Box::new(ProofOfWorkMiner::new()),
            )
            .unwrap(),
        );
        ledger.initialize().unwrap();
        Fixture {
            verifier: IntegrityVerifier::new(Arc::clone(&ledger)),
            ledger,
            store,
            chain,
        }
    }

    fn fixture(block_size: usize, difficulty: usize) -> Fixture {
        fixture_on(InMemoryChainStore::new(), InMemoryAuditStore::new(), block_size, difficulty)
    }

    /// An in-memory store that rejects every chain-hash attach, leaving
    /// sealed rows unlinked.
    #[derive(Clone, Default)]
    struct UnlinkableStore(InMemoryAuditStore);

    impl DurableAuditStore for UnlinkableStore {
        fn save(&self, row: AuditRow) -> LedgerResult<AuditRow> {
            self.0.save(row)
        }

        fn attach_chain_hash(&self, _row_id: u64, _transaction_hash: &str) -> LedgerResult<()> {
            Err(LedgerError::Persistence {
                reason: "attach rejected".to_string(),
            })
        }

        fn find_by_id(&self, row_id: u64) -> LedgerResult<Option<AuditRow>> {
            self.0.find_by_id(row_id)
        }

        fn find_by_chain_hash(&self, transaction_hash: &str) -> LedgerResult<Option<AuditRow>> {
            self.0.find_by_chain_hash(transaction_hash)
        }

        fn find_by_entry_id(&self, entry_id: Uuid) -> LedgerResult<Option<AuditRow>> {
            self.0.find_by_entry_id(entry_id)
        }

        fn find_unsealed(&self) -> LedgerResult<Vec<AuditRow>> {
            self.0.find_unsealed()
        }

        fn find_by_entity_and_time_range(
            &self,
            entity_type: &str,
            entity_id: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> LedgerResult<Vec<AuditRow>> {
            self.0.find_by_entity_and_time_range(entity_type, entity_id, start, end)
        }

        fn find_by_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> LedgerResult<Vec<AuditRow>> {
            self.0.find_by_time_range(start, end)
        }
    }

    fn event(n: usize) -> EventRequest {
        EventRequest {
            event_type: "PAYMENT_PROCESSED".to_string(),
            entity_type: "payment".to_string(),
            entity_id: format!("pay-{}", n),
            user_id: Some("cashier-7".to_string()),
            action: "capture".to_string(),
            details: format!("{{\"amount_cents\":{}}}", 1000 + n),
            client: ClientContext {
                ip_address: Some("192.168.0.10".to_string()),
                user_agent: Some("pos/2.1".to_string()),
                session_id: Some("s-1".to_string()),
                correlation_id: Some(format!("corr-{}", n)),
            },
        }
    }

    fn record(f: &Fixture, count: usize) -> Vec<String> {
        (0..count).map(|n| f.ledger.record_event(event(n)).unwrap()).collect()
    }

    // ── Chain verification ────────────────────────────────────────────────────

    #[test]
    fn test_genesis_only_chain_is_valid() {
        let f = fixture(3, 2);
        let result = f.verifier.verify_chain().unwrap();
        assert!(result.valid);
        assert_eq!(result.blocks_checked, 1);
        assert!(f.ledger.find_entry(&"0".repeat(64)).unwrap().is_none());
    }

    #[test]
    fn test_three_events_seal_one_block_at_difficulty_two() {
        let f = fixture(3, 2);
        let hashes = record(&f, 3);

        let chain = f.ledger.snapshot().unwrap();
        assert_eq!(chain.len(), 2, "exactly one block beyond genesis");
        assert!(chain[1].hash.starts_with("00"));
        assert_eq!(chain[1].entries.len(), 3);
        for (entry, tx) in chain[1].entries.iter().zip(&hashes) {
            assert_eq!(&auditledger_chain::hash_entry(entry), tx, "submission order preserved");
        }
        assert!(f.verifier.verify_chain().unwrap().valid);
    }

    #[test]
    fn test_empty_slice_is_valid() {
        let result = verify_blocks(&[], 4);
        assert!(result.valid);
        assert_eq!(result.blocks_checked, 0);
    }

    #[test]
    fn test_tampered_entry_identifies_first_offending_block() {
        let f = fixture(2, 1);
        record(&f, 6);
        let mut blocks = f.ledger.snapshot().unwrap();
        assert_eq!(blocks.len(), 4);

        blocks[2].entries[1].details = "{\"amount_cents\":1}".to_string();

        let result = verify_blocks(&blocks, 1);
        assert!(!result.valid);
        assert_eq!(result.first_failed_block(), Some(2));
        assert_eq!(result.blocks_checked, 3);
        assert!(matches!(
            result.failure.unwrap().failure,
            BlockFailureKind::HashMismatch { .. }
        ));
    }

    /// Re-mining a tampered block fixes its own hash but breaks the next link.
    #[test]
    fn test_remined_block_breaks_next_link() {
        let f = fixture(2, 1);
        record(&f, 4);
        let mut blocks = f.ledger.snapshot().unwrap();

        blocks[1].entries[0].action = "refund".to_string();
        let candidate = CandidateBlock {
            index: blocks[1].index,
            timestamp: blocks[1].timestamp,
            previous_hash: blocks[1].previous_hash.clone(),
            entries: blocks[1].entries.clone(),
        };
        blocks[1] = ProofOfWorkMiner::new().mine(candidate, 1).unwrap();

        let result = verify_blocks(&blocks, 1);
        assert_eq!(result.first_failed_block(), Some(2));
        assert!(matches!(
            result.failure.unwrap().failure,
            BlockFailureKind::BrokenLink { .. }
        ));
    }

    #[test]
    fn test_reordered_blocks_are_detected() {
        let f = fixture(1, 1);
        record(&f, 3);
        let mut blocks = f.ledger.snapshot().unwrap();
        blocks.swap(1, 2);

        let result = verify_blocks(&blocks, 1);
        assert_eq!(result.first_failed_block(), Some(1));
        assert!(matches!(
            result.failure.unwrap().failure,
            BlockFailureKind::IndexOutOfSequence { expected: 1, found: 2 }
        ));
    }

    #[test]
    fn test_bad_genesis_and_difficulty_are_detected() {
        let f = fixture(3, 1);
        let mut blocks = f.ledger.snapshot().unwrap();

        let result = verify_blocks(&blocks, 64);
        assert!(matches!(
            result.failure.unwrap().failure,
            BlockFailureKind::DifficultyNotMet { difficulty: 64, .. }
        ));

        blocks[0].previous_hash = "1".to_string();
        let result = verify_blocks(&blocks, 1);
        assert!(matches!(
            result.failure.unwrap().failure,
            BlockFailureKind::BadGenesis { .. }
        ));
    }

    /// Tampering with the persisted chain is caught after a restart.
    #[test]
    fn test_tampered_chain_store_detected_after_restart() {
        let f = fixture(2, 1);
        record(&f, 4);
        let mut block = f.ledger.block(1).unwrap().unwrap();
        block.entries[0].user_id = Some("intruder".to_string());
        f.chain.overwrite(block).unwrap();

        let restarted = fixture_on(f.chain.clone(), f.store.clone(), 2, 1);
        let result = restarted.verifier.verify_chain().unwrap();
        assert!(!result.valid);
        assert_eq!(result.first_failed_block(), Some(1));
    }

    #[test]
    fn test_verification_is_idempotent_and_read_only() {
        let f = fixture(2, 1);
        record(&f, 4);
        let before = f.ledger.snapshot().unwrap();

        let first = f.verifier.verify_chain().unwrap();
        let second = f.verifier.verify_chain().unwrap();
        assert_eq!(first, second);
        assert_eq!(f.ledger.snapshot().unwrap(), before);
    }

    #[test]
    fn test_verify_range_counts_period_blocks() {
        let f = fixture(2, 1);
        record(&f, 4);
        let now = Utc::now();

        let summary = f.verifier.verify_range(now - Duration::hours(1), now + Duration::hours(1)).unwrap();
        assert!(summary.chain_valid);
        assert_eq!(summary.total_blocks, 3);
        assert_eq!(summary.blocks_in_period, 3);

        let summary = f
            .verifier
            .verify_range(now - Duration::days(2), now - Duration::days(1))
            .unwrap();
        assert_eq!(summary.blocks_in_period, 0);
        assert_eq!(summary.verification.blocks_checked, 0);
    }

    // ── Entry verification ────────────────────────────────────────────────────

    #[test]
    fn test_untampered_row_matches_chain() {
        let f = fixture(3, 1);
        let hashes = record(&f, 3);

        let result = f.verifier.verify_row(2).unwrap();
        assert!(result.chain_valid);
        assert!(result.transaction_found);
        assert!(result.data_matches);
        assert!(result.row_linked);
        assert_eq!(result.transaction_hash.as_deref(), Some(hashes[1].as_str()));
        assert_eq!(result.block_index, Some(1));
    }

    /// Editing the durable copy is caught by the entry check while the chain
    /// itself still verifies.
    #[test]
    fn test_tampered_row_reports_found_but_mismatched() {
        let f = fixture(3, 2);
        record(&f, 3);

        let mut row = f.store.find_by_id(1).unwrap().unwrap();
        row.details = "{\"amount_cents\":0}".to_string();
        f.store.overwrite(row.clone()).unwrap();

        let result = f.verifier.verify_entry(&row).unwrap();
        assert!(result.transaction_found);
        assert!(!result.data_matches);
        assert_eq!(result.mismatched_fields, vec!["details".to_string()]);
        assert!(result.chain_valid);
        assert!(f.verifier.verify_chain().unwrap().valid);
    }

    #[test]
    fn test_unsealed_row_is_unverifiable_not_tampered() {
        let f = fixture(3, 1);
        let tx = f.ledger.record_event(event(1)).unwrap();

        let result = f.verifier.verify_row(1).unwrap();
        assert!(result.chain_valid);
        assert!(!result.transaction_found);
        assert!(!result.data_matches);
        assert!(result.mismatched_fields.is_empty());

        let by_hash = f.verifier.verify_transaction(&tx).unwrap();
        assert!(!by_hash.transaction_found);
    }

    #[test]
    fn test_verify_transaction_for_sealed_entry() {
        let f = fixture(2, 1);
        let hashes = record(&f, 2);
        let result = f.verifier.verify_transaction(&hashes[0]).unwrap();
        assert!(result.transaction_found);
        assert!(result.data_matches);
        assert_eq!(result.row_id, Some(1));
    }

    /// A sealed entry whose attach failed is matched by entry id: the data
    /// still verifies, and only the missing link is reported.
    #[test]
    fn test_unlinked_sealed_row_is_not_reported_as_tampered() {
        let store = UnlinkableStore::default();
        let config = LedgerConfig {
            block_size: 2,
            difficulty: 1,
            ..Default::default()
        };
        let ledger = Arc::new(
            Ledger::new(
                config,
                Arc::new(store.clone()),
                Box::new(InMemoryChainStore::new()),
                Box::new(ProofOfWorkMiner::new()),
            )
            .unwrap(),
        );
        ledger.initialize().unwrap();
        let hashes: Vec<String> = (0..2).map(|n| ledger.record_event(event(n)).unwrap()).collect();
        assert_eq!(ledger.unlinked_len().unwrap(), 2);
        let verifier = IntegrityVerifier::new(Arc::clone(&ledger));

        let result = verifier.verify_transaction(&hashes[0]).unwrap();
        assert!(result.transaction_found);
        assert!(result.data_matches);
        assert!(!result.row_linked);
        assert!(result.mismatched_fields.is_empty());
        assert_eq!(result.row_id, Some(1));
        assert_eq!(result.block_index, Some(1));
        assert_eq!(result.transaction_hash.as_deref(), Some(hashes[0].as_str()));

        let by_row = verifier.verify_row(2).unwrap();
        assert!(by_row.data_matches);
        assert!(!by_row.row_linked);
        assert_eq!(by_row.transaction_hash.as_deref(), Some(hashes[1].as_str()));

        let mut row = store.find_by_id(1).unwrap().unwrap();
        row.action = "refund".to_string();
        store.0.overwrite(row).unwrap();
        let edited = verifier.verify_transaction(&hashes[0]).unwrap();
        assert!(!edited.data_matches);
        assert_eq!(edited.mismatched_fields, vec!["action".to_string()]);
    }

    #[test]
    fn test_unknown_identifiers_are_not_found() {
        let f = fixture(2, 1);
        assert!(matches!(f.verifier.verify_row(42), Err(LedgerError::NotFound { .. })));
        assert!(matches!(
            f.verifier.verify_transaction(&"f".repeat(64)),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_verify_entries_batch() {
        let f = fixture(2, 1);
        record(&f, 3);
        let rows = f
            .store
            .find_by_time_range(Utc::now() - Duration::hours(1), Utc::now() + Duration::hours(1))
            .unwrap();
        let results = f.verifier.verify_entries(&rows).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.data_matches).count(), 2);
        assert_eq!(results.iter().filter(|r| !r.transaction_found).count(), 1);
    }
}
