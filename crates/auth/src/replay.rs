//! Single-use tracking for refresh tokens.
//!
//! `rotate` itself is stateless and cannot guarantee single-use; consumers
//! layer this registry in front of it: claim the token's `jti` before
//! rotating and reject when it was already claimed. Entries live as long as
//! the token they describe; once a token has expired, its verification
//! fails anyway and the entry can be dropped.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// In-process set of consumed refresh-token identifiers with TTL.
#[derive(Debug, Default)]
pub struct UsedTokenRegistry {
    used: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl UsedTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a refresh token's `jti` for its one allowed use.
    ///
    /// Returns `false` when the identifier was already claimed (reuse).
    /// `expires_at` is the token's own expiry; the entry is retained until
    /// then and purged afterwards.
    pub fn claim(&self, jti: Uuid, expires_at: DateTime<Utc>) -> bool {
        self.claim_at(jti, expires_at, Utc::now())
    }

    /// Clock-explicit variant of [`claim`](Self::claim) for tests.
    pub fn claim_at(&self, jti: Uuid, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let mut used = self.used.lock().unwrap_or_else(|e| e.into_inner());
        used.retain(|_, expiry| *expiry > now);

        if used.contains_key(&jti) {
            return false;
        }
        used.insert(jti, expires_at);
        true
    }

    /// Number of live (unexpired) claimed identifiers.
    pub fn len(&self) -> usize {
        self.used.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn second_claim_of_same_jti_is_rejected() {
        let registry = UsedTokenRegistry::new();
        let jti = Uuid::now_v7();
        let expiry = Utc::now() + Duration::days(7);

        assert!(registry.claim(jti, expiry));
        assert!(!registry.claim(jti, expiry));
    }

    #[test]
    fn distinct_jtis_claim_independently() {
        let registry = UsedTokenRegistry::new();
        let expiry = Utc::now() + Duration::days(7);

        assert!(registry.claim(Uuid::now_v7(), expiry));
        assert!(registry.claim(Uuid::now_v7(), expiry));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn expired_entries_are_purged() {
        let registry = UsedTokenRegistry::new();
        let now = Utc::now();
        let jti = Uuid::now_v7();

        assert!(registry.claim_at(jti, now + Duration::seconds(10), now));
        assert_eq!(registry.len(), 1);

        // After the token's own expiry the entry no longer matters: the
        // token fails verification on its exp claim regardless.
        let later = now + Duration::seconds(11);
        assert!(registry.claim_at(Uuid::now_v7(), later + Duration::days(7), later));
        assert_eq!(registry.len(), 1);
    }
}
