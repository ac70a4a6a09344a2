//! # auditledger-report
//!
//! Read-side compliance aggregation for the audit ledger: per-event-type
//! counts, row-level integrity tallies, security counters, and a nested
//! chain-integrity summary for a time window.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auditledger_report::ComplianceReporter;
//!
//! let reporter = ComplianceReporter::new(Arc::clone(&ledger));
//! let report = reporter.generate(start, end)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

pub mod reporter;

pub use reporter::ComplianceReporter;

// ── Tests ─────────────────────────────────────────────────────────────────────
