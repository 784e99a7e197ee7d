//! Session lifecycle: who am I, token rotation, logout.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Extension};
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use chrono::{DateTime, Utc};

use taskgate_auth::{Principal, TokenError, TokenPair};

use crate::app::AppState;
use crate::errors::AccessError;
use crate::guard::RequestMeta;
use crate::transport;

/// Resolved rotation, shared between collapsed concurrent refreshes.
#[derive(Debug, Clone)]
pub struct RefreshSuccess {
    pub pair: TokenPair,
    pub principal: Principal,
}

pub type RefreshOutcome = Result<RefreshSuccess, AccessError>;

/// `GET /auth/me`: echo the authenticated principal.
pub async fn me(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "data": { "principal": principal },
    }))
}

/// `POST /auth/refresh`: rotate the refresh token and mint a new pair.
///
/// The refresh token is accepted from its cookie only, never from the
/// Authorization header. Concurrent requests carrying the same token are
/// collapsed onto one rotation and all see the same outcome.
pub async fn refresh(
    Extension(state): Extension<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AccessError> {
    let mut meta = RequestMeta::new("/auth/refresh");
    if let Some(ConnectInfo(addr)) = connect_info {
        meta = meta.with_source(addr.to_string());
    }

    let Some(token) = transport::cookie_value(&headers, transport::REFRESH_COOKIE) else {
        let err = AccessError::refresh_invalid("missing refresh cookie");
        state.guard.record(None, "auth", "refresh", false, &err.to_string(), &meta);
        return Err(err);
    };

    let outcome = {
        let state = state.clone();
        let token_for_op = token.clone();
        state
            .refresh_gate
            .clone()
            .run(&token, move || perform_refresh(state, token_for_op))
            .await
    };

    match outcome {
        Ok(success) => {
            state.guard.record(
                Some(&success.principal),
                "auth",
                "refresh",
                true,
                "token rotated",
                &meta,
            );

            let cookies = AppendHeaders([
                (
                    header::SET_COOKIE,
                    transport::access_cookie(&state.config, &success.pair.access),
                ),
                (
                    header::SET_COOKIE,
                    transport::refresh_cookie(&state.config, &success.pair.refresh),
                ),
            ]);
            let body = Json(serde_json::json!({
                "success": true,
                "data": {
                    "accessToken": success.pair.access,
                    "principal": success.principal,
                },
                "tokenRotation": { "rotated": true },
            }));
            Ok((cookies, body))
        }
        Err(err) => {
            state.guard.record(None, "auth", "refresh", false, &err.to_string(), &meta);
            Err(err)
        }
    }
}

/// `POST /auth/logout`: clear both credential cookies.
///
/// Stateless: the access token stays technically valid until expiry, the
/// browser just stops carrying it.
pub async fn logout(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let [access, refresh] = transport::clear_credentials(&state.config);
    (
        AppendHeaders([(header::SET_COOKIE, access), (header::SET_COOKIE, refresh)]),
        Json(serde_json::json!({ "success": true })),
    )
}

/// The rotation itself, run at most once per in-flight token.
async fn perform_refresh(state: Arc<AppState>, token: String) -> RefreshOutcome {
    let claims = state.tokens.verify_refresh(&token).map_err(|err| match err {
        TokenError::Expired => AccessError::refresh_invalid("refresh token expired"),
        _ => AccessError::refresh_invalid("invalid refresh token"),
    })?;

    let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
        .ok_or_else(|| AccessError::refresh_invalid("invalid refresh token"))?;

    // Single use: the jti is burned whether or not the rest succeeds.
    if !state.used_tokens.claim(claims.jti, expires_at) {
        return Err(AccessError::refresh_invalid("refresh token already used"));
    }

    // Re-fetch the identity so role changes and deletions take effect here,
    // not a week later when the refresh token dies.
    let principal = state
        .directory
        .find(claims.id)
        .await
        .ok_or_else(|| AccessError::refresh_invalid("unknown identity"))?;

    let pair = state
        .tokens
        .rotate(&token, &principal)
        .map_err(|_| AccessError::refresh_invalid("invalid refresh token"))?;

    Ok(RefreshSuccess { pair, principal })
}
