//! Canonical byte encoding for entries and blocks.
//!
//! Every hash in the ledger is computed over bytes produced here, and only
//! here, so entry hashing, block hashing, mining and verification can never
//! drift apart. Serde output and `Debug` strings are never hashed.
//!
//! Encoding rules:
//!   - strings: 8-byte little-endian length, then UTF-8 bytes
//!   - optional strings: one tag byte (0 = absent, 1 = present), then the string
//!   - integers: 8-byte little-endian
//!   - timestamps: RFC 3339 UTC with nanosecond precision, encoded as a string
//!
//! Entry field order:
//!   id, timestamp, event_type, entity_type, entity_id, user_id, action,
//!   details, ip_address, user_agent, session_id, correlation_id
//!
//! Block preimage order (the nonce is appended separately by the hasher):
//!   index, timestamp, previous_hash, entry count, each entry's encoding as a
//!   length-prefixed byte string

use chrono::{DateTime, SecondsFormat, Utc};

use auditledger_contracts::entry::AuditEntry;

const ENTRY_TAG: &str = "auditledger/entry/v1";
const BLOCK_TAG: &str = "auditledger/block/v1";

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_bytes(buf, s.as_bytes());
}

fn put_opt(buf: &mut Vec<u8>, s: Option<&str>) {
    match s {
        None => buf.push(0),
        Some(s) => {
            buf.push(1);
            put_str(buf, s);
        }
    }
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_timestamp(buf: &mut Vec<u8>, ts: &DateTime<Utc>) {
    put_str(buf, &ts.to_rfc3339_opts(SecondsFormat::Nanos, true));
}

/// Canonical bytes of one entry.
pub fn encode_entry(entry: &AuditEntry) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256 + entry.details.len());
    put_str(&mut buf, ENTRY_TAG);
    put_str(&mut buf, &entry.id.hyphenated().to_string());
    put_timestamp(&mut buf, &entry.timestamp);
    put_str(&mut buf, entry.event_type.as_str());
    put_str(&mut buf, &entry.entity_type);
    put_str(&mut buf, &entry.entity_id);
    put_opt(&mut buf, entry.user_id.as_deref());
    put_str(&mut buf, &entry.action);
    put_str(&mut buf, &entry.details);
    put_opt(&mut buf, entry.client.ip_address.as_deref());
    put_opt(&mut buf, entry.client.user_agent.as_deref());
    put_opt(&mut buf, entry.client.session_id.as_deref());
    put_opt(&mut buf, entry.client.correlation_id.as_deref());
    buf
}

/// Canonical bytes of a block's content, excluding the nonce.
pub fn encode_block_preimage(
    index: u64,
    timestamp: &DateTime<Utc>,
    previous_hash: &str,
    entries: &[AuditEntry],
) -> Vec<u8> {
    let mut buf = Vec::new();
    put_str(&mut buf, BLOCK_TAG);
    put_u64(&mut buf, index);
    put_timestamp(&mut buf, timestamp);
    put_str(&mut buf, previous_hash);
    put_u64(&mut buf, entries.len() as u64);
    for entry in entries {
        put_bytes(&mut buf, &encode_entry(entry));
    }
    buf
}
