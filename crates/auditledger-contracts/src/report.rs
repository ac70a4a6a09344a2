//! Compliance report documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::row::AuditRow;
use crate::verify::{ChainVerification, EntryVerification};

/// Chain-level integrity summary for a report window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainIntegritySummary {
    pub chain_valid: bool,
    pub total_blocks: usize,
    /// Blocks whose creation time falls inside the window.
    pub blocks_in_period: usize,
    pub first_failed_block: Option<u64>,
    pub verification: ChainVerification,
}

/// Row-level verification tallies for the window's rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryIntegritySummary {
    /// Sealed rows whose fields match the chain copy.
    pub verified: u64,
    /// Sealed rows whose fields diverge from the chain copy.
    pub tampered: u64,
    /// Rows not yet sealed, or whose hash is absent from the chain.
    pub unverifiable: u64,
    /// Sealed rows (counted above) whose chain hash was never attached.
    pub unlinked: u64,
}

/// Derived security counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySummary {
    pub failed_logins: u64,
    pub security_alerts: u64,
    pub permission_changes: u64,
    pub password_changes: u64,
    pub data_deletions: u64,
    pub data_exports: u64,
    pub distinct_users: u64,
    pub distinct_ip_addresses: u64,
}

/// Aggregate view of one `[period_start, period_end)` window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub total_events: u64,
    /// Keyed by the event type's wire name; sorted for stable output.
    pub events_by_type: BTreeMap<String, u64>,
    pub sealed_events: u64,
    pub unsealed_events: u64,
    pub entry_integrity: EntryIntegritySummary,
    pub security: SecuritySummary,
    pub chain_integrity: ChainIntegritySummary,
}

/// One row of an entity's audit trail with its verification outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailEntry {
    pub row: AuditRow,
    pub verification: EntryVerification,
}
