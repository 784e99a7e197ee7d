//! Audit sink trait and the in-process implementation.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::entry::{AuditEntry, AuditFilter};

/// Append-only sink for access decisions.
///
/// `record` is infallible at the call boundary: an audit write failure must
/// never convert an allow/deny decision into an error for the caller.
/// Implementations swallow and trace their own failures. Append order is
/// preserved within a process.
pub trait AuditSink: Send + Sync {
    /// Append one decision.
    fn record(&self, entry: AuditEntry);

    /// Return up to `limit` matching entries, most-recent-first.
    fn query(&self, filter: &AuditFilter, limit: usize) -> Vec<AuditEntry>;
}

/// Bounded in-memory ring buffer sink.
///
/// Intended for tests/dev and as the default in-process sink; a production
/// deployment would put durable storage behind the same trait.
#[derive(Debug)]
pub struct MemoryAuditSink {
    capacity: usize,
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl MemoryAuditSink {
    pub const DEFAULT_CAPACITY: usize = 4096;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            // Oldest entry gives way; the ring is bounded.
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    fn query(&self, filter: &AuditFilter, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect()
    }
}
