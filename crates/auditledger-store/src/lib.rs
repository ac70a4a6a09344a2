//! # auditledger-store
//!
//! Reference collaborators for the audit ledger:
//!
//! - [`InMemoryAuditStore`]: the durable-store contract held in memory
//! - [`InMemoryChainStore`]: sealed blocks kept for the life of the process
//! - [`JsonLinesChainStore`]: sealed blocks in an append-only `.jsonl` file
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use auditledger_store::{InMemoryAuditStore, JsonLinesChainStore};
//!
//! let store = Arc::new(InMemoryAuditStore::new());
//! let chain = JsonLinesChainStore::new("data/chain.jsonl")?;
//! ```

pub mod file;
pub mod memory;

pub use file::{load_chain_file, JsonLinesChainStore};
pub use memory::{InMemoryAuditStore, InMemoryChainStore};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use auditledger_chain::hash_block;
    use auditledger_contracts::{
        entry::{AuditEntry, EventRequest, EventType},
        error::LedgerError,
        row::AuditRow,
    };
    use auditledger_core::{
        traits::{ChainStore, DurableAuditStore},
        Ledger, LedgerConfig, ProofOfWorkMiner,
    };

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// A saved-shape row for `entity_id` at `timestamp`.
    fn entry_at(entity_id: &str, timestamp: DateTime<Utc>) -> AuditRow {
        let request = EventRequest {
            event_type: "LOGIN".to_string(),
            entity_type: "user".to_string(),
            entity_id: entity_id.to_string(),
            action: "login".to_string(),
            ..Default::default()
        };
        AuditRow::from_entry(&AuditEntry::from_request(request, EventType::Login, timestamp))
    }

    fn event(n: usize) -> EventRequest {
        EventRequest {
            event_type: "DATA_MODIFICATION".to_string(),
            entity_type: "invoice".to_string(),
            entity_id: n.to_string(),
            user_id: Some("clerk".to_string()),
            action: "update".to_string(),
            details: format!("amount={}", n * 10),
            ..Default::default()
        }
    }

    fn ledger_on(chain: Box<dyn ChainStore>) -> Ledger {
        let config = LedgerConfig {
            block_size: 2,
            difficulty: 1,
            ..Default::default()
        };
        Ledger::new(config, Arc::new(InMemoryAuditStore::new()), chain, Box::new(ProofOfWorkMiner::new())).unwrap()
    }

    // ── InMemoryAuditStore ────────────────────────────────────────────────────

    #[test]
    fn test_save_assigns_sequential_ids() {
        let store = InMemoryAuditStore::new();
        let now = Utc::now();
        let a = store.save(entry_at("a", now)).unwrap();
        let b = store.save(entry_at("b", now)).unwrap();
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_attach_and_find_by_chain_hash() {
        let store = InMemoryAuditStore::new();
        let row = store.save(entry_at("a", Utc::now())).unwrap();
        store.attach_chain_hash(1, "beef").unwrap();

        let found = store.find_by_chain_hash("beef").unwrap().unwrap();
        assert_eq!(found.entry_id, row.entry_id);
        assert!(store.find_by_chain_hash("dead").unwrap().is_none());

        let err = store.attach_chain_hash(99, "beef").unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[test]
    fn test_time_range_is_half_open() {
        let store = InMemoryAuditStore::new();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        store.save(entry_at("a", t0)).unwrap();
        store.save(entry_at("a", t0 + Duration::hours(1))).unwrap();
        store.save(entry_at("b", t0 + Duration::hours(1))).unwrap();

        let rows = store.find_by_time_range(t0, t0 + Duration::hours(1)).unwrap();
        assert_eq!(rows.len(), 1, "end bound is exclusive");

        let rows = store
            .find_by_entity_and_time_range("user", "a", t0, t0 + Duration::hours(2))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.entity_id == "a"));
    }

    #[test]
    fn test_find_unsealed_and_by_entry_id() {
        let store = InMemoryAuditStore::new();
        let now = Utc::now();
        let a = store.save(entry_at("a", now)).unwrap();
        store.save(entry_at("b", now)).unwrap();
        store.save(entry_at("c", now)).unwrap();
        store.attach_chain_hash(2, "beef").unwrap();

        let ids: Vec<Option<u64>> = store.find_unsealed().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(1), Some(3)]);

        let found = store.find_by_entry_id(a.entry_id).unwrap().unwrap();
        assert_eq!(found.id, Some(1));
        assert!(store.find_by_entry_id(uuid::Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_overwrite_replaces_row() {
        let store = InMemoryAuditStore::new();
        let mut row = store.save(entry_at("a", Utc::now())).unwrap();
        row.details = "edited".to_string();
        store.overwrite(row).unwrap();
        assert_eq!(store.find_by_id(1).unwrap().unwrap().details, "edited");

        let unsaved: AuditRow = entry_at("b", Utc::now());
        assert!(matches!(store.overwrite(unsaved), Err(LedgerError::Validation { .. })));
    }

    // ── Chain stores ──────────────────────────────────────────────────────────

    #[test]
    fn test_in_memory_chain_survives_ledger_restart() {
        let chain = InMemoryChainStore::new();
        let first = ledger_on(Box::new(chain.clone()));
        first.initialize().unwrap();
        first.record_event(event(1)).unwrap();
        first.record_event(event(2)).unwrap();

        let second = ledger_on(Box::new(chain.clone()));
        second.initialize().unwrap();
        assert_eq!(second.snapshot().unwrap(), first.snapshot().unwrap());
    }

    #[test]
    fn test_json_lines_round_trip_preserves_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chain.jsonl");

        let ledger = ledger_on(Box::new(JsonLinesChainStore::new(&path).unwrap()));
        ledger.initialize().unwrap();
        for n in 0..4 {
            ledger.record_event(event(n)).unwrap();
        }
        let in_memory = ledger.snapshot().unwrap();
        assert_eq!(in_memory.len(), 3);

        let loaded = load_chain_file(&path).unwrap();
        assert_eq!(loaded, in_memory, "file must hold blocks in append order");
        for block in &loaded {
            assert_eq!(hash_block(block), block.hash, "hash must survive serialization");
        }

        let restarted = ledger_on(Box::new(JsonLinesChainStore::new(&path).unwrap()));
        restarted.initialize().unwrap();
        assert_eq!(restarted.last_block_hash().unwrap(), in_memory[2].hash);
    }

    #[test]
    fn test_missing_chain_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLinesChainStore::new(dir.path().join("absent.jsonl")).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_chain_line_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.jsonl");
        std::fs::write(&path, "{not json}\n").unwrap();

        let err = load_chain_file(&path).unwrap_err();
        assert!(matches!(err, LedgerError::Persistence { .. }));
        assert!(err.to_string().contains("line 1"));
    }
}
