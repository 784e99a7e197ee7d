//! Audit trail review endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Extension, Query};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use taskgate_audit::AuditFilter;
use taskgate_auth::{Action, Resource};
use taskgate_core::UserId;

use crate::app::AppState;
use crate::errors::AccessError;
use crate::guard::RequestMeta;

const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<Uuid>,
    #[serde(default)]
    pub denied_only: bool,
    pub limit: Option<usize>,
}

/// `GET /audit`: most-recent-first audit entries, for roles allowed to read
/// the audit log.
pub async fn query(
    Extension(state): Extension<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Query(params): Query<AuditQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AccessError> {
    let mut meta = RequestMeta::new("/audit");
    if let Some(ConnectInfo(addr)) = connect_info {
        meta = meta.with_source(addr.to_string());
    }

    state
        .guard
        .authorize(&headers, &meta, Resource::AuditLog, Action::Read)?;

    let filter = AuditFilter {
        actor_id: params.actor_id.map(UserId::from_uuid),
        denied_only: params.denied_only,
    };
    let entries = state
        .audit
        .query(&filter, params.limit.unwrap_or(DEFAULT_LIMIT));

    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "entries": entries },
    })))
}
