//! Audit entry types.
//!
//! `EventRequest` is the raw, caller-supplied event descriptor. After
//! validation the ledger turns it into an `AuditEntry`, the immutable value
//! that is hashed, persisted, and eventually sealed into a block.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// The kinds of security and compliance events the ledger records.
///
/// Serialized (and parsed) in SCREAMING_SNAKE_CASE, e.g. `"LOGIN_FAILED"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Login,
    Logout,
    LoginFailed,
    PasswordChange,
    PermissionChange,
    DataAccess,
    DataModification,
    DataDeletion,
    DataExport,
    PaymentProcessed,
    ConfigurationChange,
    SecurityAlert,
    SystemEvent,
}

impl EventType {
    /// Every variant, in declaration order.
    pub const ALL: [EventType; 13] = [
        EventType::Login,
        EventType::Logout,
        EventType::LoginFailed,
        EventType::PasswordChange,
        EventType::PermissionChange,
        EventType::DataAccess,
        EventType::DataModification,
        EventType::DataDeletion,
        EventType::DataExport,
        EventType::PaymentProcessed,
        EventType::ConfigurationChange,
        EventType::SecurityAlert,
        EventType::SystemEvent,
    ];

    /// The stable wire name. This is also the form fed into hashing, so it
    /// must never change for an existing variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Login => "LOGIN",
            EventType::Logout => "LOGOUT",
            EventType::LoginFailed => "LOGIN_FAILED",
            EventType::PasswordChange => "PASSWORD_CHANGE",
            EventType::PermissionChange => "PERMISSION_CHANGE",
            EventType::DataAccess => "DATA_ACCESS",
            EventType::DataModification => "DATA_MODIFICATION",
            EventType::DataDeletion => "DATA_DELETION",
            EventType::DataExport => "DATA_EXPORT",
            EventType::PaymentProcessed => "PAYMENT_PROCESSED",
            EventType::ConfigurationChange => "CONFIGURATION_CHANGE",
            EventType::SecurityAlert => "SECURITY_ALERT",
            EventType::SystemEvent => "SYSTEM_EVENT",
        }
    }

    /// True for event types that count towards the security section of a
    /// compliance report.
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            EventType::LoginFailed
                | EventType::PasswordChange
                | EventType::PermissionChange
                | EventType::SecurityAlert
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| LedgerError::Validation {
                reason: format!("unknown event type '{}'", s),
            })
    }
}

/// Network and client context captured alongside an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
    pub correlation_id: Option<String>,
}

/// The event descriptor accepted by `Ledger::record_event`.
///
/// Fields are raw strings; `event_type`, `entity_type` and `entity_id` are
/// required and checked by `validate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRequest {
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub user_id: Option<String>,
    pub action: String,
    pub details: String,
    #[serde(default)]
    pub client: ClientContext,
}

impl EventRequest {
    /// Check required fields and parse the event type.
    pub fn validate(&self) -> Result<EventType, LedgerError> {
        if self.event_type.trim().is_empty() {
            return Err(LedgerError::Validation {
                reason: "event type is required".to_string(),
            });
        }
        if self.entity_type.trim().is_empty() {
            return Err(LedgerError::Validation {
                reason: "entity type is required".to_string(),
            });
        }
        if self.entity_id.trim().is_empty() {
            return Err(LedgerError::Validation {
                reason: "entity id is required".to_string(),
            });
        }
        self.event_type.parse()
    }
}

/// One immutable recorded event.
///
/// Nothing in the ledger mutates an `AuditEntry` after construction; blocks
/// hold clones, and the durable store holds a row-shaped copy. Identity for
/// hashing purposes comes from the canonical encoding in `auditledger-chain`,
/// never from `Debug` or serde output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Opaque unique token assigned at creation.
    pub id: Uuid,
    /// Wall-clock time (UTC) the event was submitted.
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub entity_type: String,
    pub entity_id: String,
    /// The acting user, if the event has one (system events may not).
    pub user_id: Option<String>,
    pub action: String,
    /// Free-form payload; typically JSON but treated as opaque text.
    pub details: String,
    pub client: ClientContext,
}

impl AuditEntry {
    /// Build an entry from a request whose event type has already been
    /// validated.
    pub fn from_request(request: EventRequest, event_type: EventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            event_type,
            entity_type: request.entity_type,
            entity_id: request.entity_id,
            user_id: request.user_id,
            action: request.action,
            details: request.details,
            client: request.client,
        }
    }
}
