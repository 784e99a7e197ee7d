//! `taskgate-audit`: append-only log of access decisions.
//!
//! Narrow `record`/`query` boundary so the backing store (in-memory ring,
//! database table, external pipe) can be swapped without touching callers.

pub mod entry;
pub mod sink;

pub use entry::{AuditEntry, AuditFilter};
pub use sink::{AuditSink, MemoryAuditSink};
