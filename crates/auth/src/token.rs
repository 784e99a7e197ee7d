//! Token service: issues, verifies, and rotates signed credentials.
//!
//! Stateless by contract: any process holding the signing secrets can verify
//! any token issued by any other process. Single-use enforcement for refresh
//! tokens is a consumer concern (see [`crate::replay`]); this service only
//! guarantees that every rotation produces a cryptographically independent
//! refresh token so reuse detection is possible upstream.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use crate::claims::{AccessClaims, RefreshClaims, REFRESH_TOKEN_TYPE};
use crate::config::AuthConfig;
use crate::principal::Principal;

/// A freshly issued access/refresh credential pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Token verification/issuance failure.
///
/// `Expired` and `Malformed` are deliberately distinct: only an expired
/// access token is worth a refresh attempt; retrying a malformed one is
/// pointless and should go straight to re-login.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// HS256 token service with independent secrets per token class.
pub struct TokenService {
    header: Header,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;

        Self {
            header: Header::new(Algorithm::HS256),
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            validation,
            access_ttl: Duration::seconds(config.access_ttl_seconds as i64),
            refresh_ttl: Duration::seconds(config.refresh_ttl_seconds as i64),
        }
    }

    /// Issue a new access/refresh pair for an identity.
    ///
    /// Pure computation: no side effects, nothing stored server-side.
    pub fn issue_pair(&self, identity: &Principal) -> Result<TokenPair, TokenError> {
        self.issue_pair_at(identity, Utc::now())
    }

    /// Issue a pair with an explicit clock. Exists so tests can mint tokens
    /// at arbitrary points in time.
    pub fn issue_pair_at(
        &self,
        identity: &Principal,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        let access_claims = AccessClaims {
            id: identity.id,
            email: identity.email.clone(),
            role: identity.role.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        let refresh_claims = RefreshClaims {
            id: identity.id,
            token_type: REFRESH_TOKEN_TYPE.to_string(),
            jti: Uuid::now_v7(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };

        let access = encode(&self.header, &access_claims, &self.access_encoding)
            .map_err(TokenError::Signing)?;
        let refresh = encode(&self.header, &refresh_claims, &self.refresh_encoding)
            .map_err(TokenError::Signing)?;

        Ok(TokenPair { access, refresh })
    }

    /// Verify an access token, returning its claims.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(token, &self.access_decoding, &self.validation)
            .map_err(map_decode_error)?;
        Ok(data.claims)
    }

    /// Verify a refresh token, returning its claims.
    ///
    /// A token that verifies under the refresh secret but does not carry
    /// `type: "refresh"` is malformed, not merely denied.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let data = decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)
            .map_err(map_decode_error)?;

        if data.claims.token_type != REFRESH_TOKEN_TYPE {
            return Err(TokenError::Malformed);
        }
        Ok(data.claims)
    }

    /// Rotate: verify a refresh token and issue a brand-new pair.
    ///
    /// The caller must supply the current authoritative identity; the
    /// service holds no user store and never trusts stale claims for
    /// anything beyond the subject id.
    pub fn rotate(&self, refresh_token: &str, identity: &Principal) -> Result<TokenPair, TokenError> {
        let claims = self.verify_refresh(refresh_token)?;
        if claims.id != identity.id {
            return Err(TokenError::Malformed);
        }
        self.issue_pair(identity)
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
