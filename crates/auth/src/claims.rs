//! JWT claims models for both token classes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use taskgate_core::UserId;

use crate::principal::Principal;

/// The `type` claim value carried by every refresh token.
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Access-token claims.
///
/// Carries the full identity needed to rebuild a [`Principal`] per request.
/// The role travels as a plain string: verification must not fail on a role
/// outside the closed set (that is a permission decision, not a token one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub id: UserId,
    pub email: String,
    pub role: String,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,

    /// Expiry, seconds since the epoch. Enforced at verification time.
    pub exp: i64,
}

impl AccessClaims {
    /// Rebuild the request-scoped identity from verified claims.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

/// Refresh-token claims.
///
/// Minimal: a stolen refresh token leaks neither role nor email.
/// `jti` is a fresh UUIDv7 per issuance; it is what single-use tracking
/// keys on (see [`crate::replay::UsedTokenRegistry`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub id: UserId,

    #[serde(rename = "type")]
    pub token_type: String,

    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}
