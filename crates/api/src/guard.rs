//! Access decision guard: the per-request authenticate/authorize machine.
//!
//! Composes the transport adapter, the token service, and the permission
//! engine. Every terminal outcome, allowed or denied, on every exit path
//! writes exactly one audit entry before returning to the caller, and the
//! entry is written synchronously at the decision point so that request
//! cancellation after the decision cannot skip it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use taskgate_audit::{AuditEntry, AuditSink};
use taskgate_auth::{has_permission, Action, Principal, Resource, Role, TokenError, TokenService};
use taskgate_core::UserId;

use crate::errors::AccessError;
use crate::transport;

/// Request facts carried into every decision for the audit trail.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub endpoint: String,
    pub source_addr: Option<String>,
}

impl RequestMeta {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            source_addr: None,
        }
    }

    pub fn with_source(mut self, addr: impl Into<String>) -> Self {
        self.source_addr = Some(addr.into());
        self
    }
}

/// Positive authorization outcome, with the ownership path visible.
#[derive(Debug, Clone)]
pub struct Decision {
    pub principal: Principal,
    pub via_ownership: bool,
}

/// The guard itself. Stateless across requests except for the audit sink.
pub struct AccessGuard {
    tokens: Arc<TokenService>,
    audit: Arc<dyn AuditSink>,
}

impl AccessGuard {
    pub fn new(tokens: Arc<TokenService>, audit: Arc<dyn AuditSink>) -> Self {
        Self { tokens, audit }
    }

    /// Identity only: extract and verify the credential, no permission check.
    pub fn authenticate(
        &self,
        headers: &HeaderMap,
        meta: &RequestMeta,
    ) -> Result<Principal, AccessError> {
        match self.identify(headers) {
            Ok(principal) => {
                self.record(Some(&principal), "auth", "authenticate", true, "authenticated", meta);
                Ok(principal)
            }
            Err(err) => {
                self.record(None, "auth", "authenticate", false, &err.to_string(), meta);
                Err(err)
            }
        }
    }

    /// Full state machine: authenticate, validate role, consult the matrix.
    pub fn authorize(
        &self,
        headers: &HeaderMap,
        meta: &RequestMeta,
        resource: Resource,
        action: Action,
    ) -> Result<Decision, AccessError> {
        self.decide(headers, meta, resource, action, None)
    }

    /// Like [`authorize`](Self::authorize), but a matrix denial may still be
    /// overridden when the principal owns the resource instance.
    pub fn authorize_with_ownership(
        &self,
        headers: &HeaderMap,
        meta: &RequestMeta,
        resource: Resource,
        action: Action,
        resource_owner: UserId,
    ) -> Result<Decision, AccessError> {
        self.decide(headers, meta, resource, action, Some(resource_owner))
    }

    /// Coarse role-list gate bypassing the matrix.
    pub fn authorize_any_role(
        &self,
        headers: &HeaderMap,
        meta: &RequestMeta,
        allowed_roles: &[Role],
    ) -> Result<Principal, AccessError> {
        let principal = match self.identify(headers) {
            Ok(principal) => principal,
            Err(err) => {
                self.record(None, "auth", "role_gate", false, &err.to_string(), meta);
                return Err(err);
            }
        };

        let Some(role) = principal.role() else {
            self.record(Some(&principal), "auth", "role_gate", false, "invalid role", meta);
            return Err(AccessError::forbidden("invalid role"));
        };

        if allowed_roles.contains(&role) {
            self.record(Some(&principal), "auth", "role_gate", true, "granted by role gate", meta);
            Ok(principal)
        } else {
            self.record(
                Some(&principal),
                "auth",
                "role_gate",
                false,
                "insufficient permissions",
                meta,
            );
            Err(AccessError::forbidden("insufficient permissions"))
        }
    }

    fn decide(
        &self,
        headers: &HeaderMap,
        meta: &RequestMeta,
        resource: Resource,
        action: Action,
        resource_owner: Option<UserId>,
    ) -> Result<Decision, AccessError> {
        let principal = match self.identify(headers) {
            Ok(principal) => principal,
            Err(err) => {
                self.record(None, resource.as_str(), action.as_str(), false, &err.to_string(), meta);
                return Err(err);
            }
        };

        // An unrecognized role is zero-permission, never an error that
        // grants access.
        let Some(role) = principal.role() else {
            self.record(Some(&principal), resource.as_str(), action.as_str(), false, "invalid role", meta);
            return Err(AccessError::forbidden("invalid role"));
        };

        if has_permission(role, resource, action) {
            self.record(Some(&principal), resource.as_str(), action.as_str(), true, "granted by role", meta);
            return Ok(Decision {
                principal,
                via_ownership: false,
            });
        }

        if resource_owner == Some(principal.id) {
            self.record(
                Some(&principal),
                resource.as_str(),
                action.as_str(),
                true,
                "ownership override",
                meta,
            );
            return Ok(Decision {
                principal,
                via_ownership: true,
            });
        }

        self.record(
            Some(&principal),
            resource.as_str(),
            action.as_str(),
            false,
            "insufficient permissions",
            meta,
        );
        Err(AccessError::forbidden("insufficient permissions"))
    }

    /// Extract + verify, without auditing. Callers audit the terminal.
    fn identify(&self, headers: &HeaderMap) -> Result<Principal, AccessError> {
        let token = transport::extract_token(headers)
            .ok_or_else(|| AccessError::unauthorized("missing credential"))?;

        let claims = self.tokens.verify_access(&token).map_err(|err| match err {
            TokenError::Expired => AccessError::expired(),
            _ => AccessError::unauthorized("invalid token"),
        })?;

        Ok(claims.principal())
    }

    /// Write one audit entry for a decision made outside the guard's own
    /// paths (the refresh endpoint uses this).
    pub fn record(
        &self,
        principal: Option<&Principal>,
        resource: &str,
        action: &str,
        allowed: bool,
        reason: &str,
        meta: &RequestMeta,
    ) {
        if allowed {
            tracing::debug!(resource, action, reason, endpoint = %meta.endpoint, "access allowed");
        } else {
            tracing::warn!(resource, action, reason, endpoint = %meta.endpoint, "access denied");
        }

        self.audit.record(AuditEntry {
            timestamp: Utc::now(),
            actor_id: principal.map(|p| p.id),
            actor_email: principal.map(|p| p.email.clone()),
            actor_role: principal.map(|p| p.role.clone()),
            resource: resource.to_string(),
            action: action.to_string(),
            allowed,
            reason: reason.to_string(),
            endpoint: meta.endpoint.clone(),
            source_addr: meta.source_addr.clone(),
        });
    }
}

/// Router state for the auth middleware layer.
#[derive(Clone)]
pub struct GuardState {
    pub guard: Arc<AccessGuard>,
}

/// Axum layer: authenticate and hand the principal to downstream handlers
/// as a request extension.
pub async fn require_auth(
    State(state): State<GuardState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AccessError> {
    let meta = meta_from_request(&req);
    let principal = state.guard.authenticate(req.headers(), &meta)?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Build request metadata from the request path and peer address.
pub fn meta_from_request(req: &Request<Body>) -> RequestMeta {
    let mut meta = RequestMeta::new(req.uri().path());
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        meta = meta.with_source(addr.to_string());
    }
    meta
}
