//! HTTP application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - shared state lives in [`AppState`], injected as an extension

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use taskgate_audit::AuditSink;
use taskgate_auth::{AuthConfig, TokenService, UsedTokenRegistry};

use crate::guard::{self, AccessGuard, GuardState};
use crate::identity::IdentityProvider;
use crate::refresh_gate::RefreshGate;

pub mod routes;

/// Shared per-process state: token service, guard, audit sink, directory,
/// and the refresh-path bookkeeping.
pub struct AppState {
    pub config: AuthConfig,
    pub tokens: Arc<TokenService>,
    pub guard: Arc<AccessGuard>,
    pub audit: Arc<dyn AuditSink>,
    pub directory: Arc<dyn IdentityProvider>,
    pub used_tokens: Arc<UsedTokenRegistry>,
    pub refresh_gate: Arc<RefreshGate<routes::session::RefreshOutcome>>,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(
    config: AuthConfig,
    directory: Arc<dyn IdentityProvider>,
    audit: Arc<dyn AuditSink>,
) -> Router {
    let tokens = Arc::new(TokenService::new(&config));
    let guard = Arc::new(AccessGuard::new(tokens.clone(), audit.clone()));

    let state = Arc::new(AppState {
        config,
        tokens,
        guard: guard.clone(),
        audit,
        directory,
        used_tokens: Arc::new(UsedTokenRegistry::new()),
        refresh_gate: Arc::new(RefreshGate::new()),
    });

    // Protected routes: authenticated principal injected as an extension.
    let protected = routes::protected_router().layer(
        ServiceBuilder::new().layer(axum::middleware::from_fn_with_state(
            GuardState { guard },
            guard::require_auth,
        )),
    );

    routes::public_router()
        .merge(protected)
        .layer(Extension(state))
}
