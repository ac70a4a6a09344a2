//! The durable audit row: the external system of record's shape for one
//! entry, plus the optional link back into the chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entry::{AuditEntry, ClientContext, EventType};

/// One row in the durable audit store.
///
/// `chain_hash` stays `None` until the matching entry has been sealed into
/// a block; a row without it is durable but not yet chain-verifiable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRow {
    /// Store-assigned identifier. `None` until the row has been saved.
    pub id: Option<u64>,
    pub entry_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub entity_type: String,
    pub entity_id: String,
    pub user_id: Option<String>,
    pub action: String,
    pub details: String,
    pub client: ClientContext,
    /// Transaction hash of the sealed entry, attached after mining.
    pub chain_hash: Option<String>,
}

impl AuditRow {
    /// Row-shaped copy of an entry, not yet saved and not yet sealed.
    pub fn from_entry(entry: &AuditEntry) -> Self {
        Self {
            id: None,
            entry_id: entry.id,
            timestamp: entry.timestamp,
            event_type: entry.event_type,
            entity_type: entry.entity_type.clone(),
            entity_id: entry.entity_id.clone(),
            user_id: entry.user_id.clone(),
            action: entry.action.clone(),
            details: entry.details.clone(),
            client: entry.client.clone(),
            chain_hash: None,
        }
    }

    /// Rebuild the entry this row was saved from.
    ///
    /// Used to re-buffer rows that were durable but unsealed when the process
    /// stopped. The result hashes to the original transaction hash only if
    /// the row has not been edited since it was saved.
    pub fn to_entry(&self) -> AuditEntry {
        AuditEntry {
            id: self.entry_id,
            timestamp: self.timestamp,
            event_type: self.event_type,
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id.clone(),
            user_id: self.user_id.clone(),
            action: self.action.clone(),
            details: self.details.clone(),
            client: self.client.clone(),
        }
    }
}
