//! Audit log entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskgate_core::UserId;

/// One access decision, allowed or denied.
///
/// Created exactly once per decision and never mutated afterwards. Actor
/// fields are absent when the request never authenticated (missing or
/// invalid credential).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub actor_id: Option<UserId>,
    pub actor_email: Option<String>,
    pub actor_role: Option<String>,
    pub resource: String,
    pub action: String,
    pub allowed: bool,
    pub reason: String,
    pub endpoint: String,
    pub source_addr: Option<String>,
}

/// Query filter for audit review.
///
/// Default is "everything"; narrow by actor and/or denied-only (the latter
/// is the intrusion-pattern review view).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub actor_id: Option<UserId>,
    pub denied_only: bool,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if self.denied_only && entry.allowed {
            return false;
        }
        if let Some(actor_id) = self.actor_id {
            if entry.actor_id != Some(actor_id) {
                return false;
            }
        }
        true
    }
}
