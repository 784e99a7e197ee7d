//! Identity lookup at token-rotation time.
//!
//! Rotation re-fetches the principal from the directory rather than trusting
//! the stale claims, so role changes and deactivations take effect on the
//! next refresh.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use taskgate_auth::Principal;
use taskgate_core::UserId;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current principal for the given id, or `None` if the identity no
    /// longer exists (deleted or deactivated).
    async fn find(&self, id: UserId) -> Option<Principal>;
}

/// In-process directory backed by a map. The production deployment swaps in
/// a store-backed provider behind the same trait.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<UserId, Principal>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, principal: Principal) {
        self.users.write().await.insert(principal.id, principal);
    }

    pub async fn remove(&self, id: UserId) -> Option<Principal> {
        self.users.write().await.remove(&id)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryDirectory {
    async fn find(&self, id: UserId) -> Option<Principal> {
        self.users.read().await.get(&id).cloned()
    }
}
