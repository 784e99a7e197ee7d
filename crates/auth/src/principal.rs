//! The authenticated identity.

use serde::{Deserialize, Serialize};

use taskgate_core::UserId;

use crate::role::Role;

/// The authenticated identity derived from a valid access token.
///
/// Ephemeral: rebuilt per request from token claims and never persisted by
/// this core. The role is kept as the raw claims string so that a token
/// carrying a retired or unknown role still authenticates; it simply holds
/// zero permissions (see [`Principal::role`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub email: String,
    pub role: String,
}

impl Principal {
    pub fn new(id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            role: role.as_str().to_string(),
        }
    }

    /// The principal's role, if it belongs to the closed set.
    ///
    /// `None` means zero-permission, not an error.
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_from_known_tag() {
        let p = Principal::new(UserId::new(), "a@example.com", Role::Editor);
        assert_eq!(p.role(), Some(Role::Editor));
    }

    #[test]
    fn unknown_role_yields_none() {
        let p = Principal {
            id: UserId::new(),
            email: "a@example.com".to_string(),
            role: "superuser".to_string(),
        };
        assert_eq!(p.role(), None);
    }
}
