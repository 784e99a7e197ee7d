use axum::{
    routing::{get, post},
    Router,
};

pub mod audit;
pub mod session;
pub mod system;

/// Routes that work without an access token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/refresh", post(session::refresh))
        .route("/auth/logout", post(session::logout))
        .route("/audit", get(audit::query))
}

/// Routes behind the authentication layer.
pub fn protected_router() -> Router {
    Router::new().route("/auth/me", get(session::me))
}
