//! Error response envelope.
//!
//! Every failure from this core is surfaced as
//! `{ success: false, message, error: { code, details? }, timestamp }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;

/// Failure taxonomy for authentication/authorization.
///
/// `Unauthorized` carries `token_expired` so consumers know whether a silent
/// refresh attempt is worthwhile. It is set only when the cause was expiry,
/// never malformation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No credential, malformed credential, or expired credential.
    #[error("{message}")]
    Unauthorized { message: String, token_expired: bool },

    /// Credential valid, identity known, but the role lacks the permission
    /// or is not recognized.
    #[error("{message}")]
    Forbidden { message: String },

    /// The refresh token failed verification or was already consumed.
    #[error("{message}")]
    RefreshInvalid { message: String },
}

impl AccessError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            token_expired: false,
        }
    }

    pub fn expired() -> Self {
        Self::Unauthorized {
            message: "token expired".to_string(),
            token_expired: true,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn refresh_invalid(message: impl Into<String>) -> Self {
        Self::RefreshInvalid {
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::RefreshInvalid { .. } => "REFRESH_INVALID",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } | Self::RefreshInvalid { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::Unauthorized { token_expired, .. } => {
                Some(json!({ "tokenExpired": token_expired }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.code(), self.to_string(), self.details())
    }
}

/// Build the failure envelope.
pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: Option<Value>,
) -> Response {
    let mut error = json!({ "code": code });
    if let Some(details) = details {
        error["details"] = details;
    }

    (
        status,
        Json(json!({
            "success": false,
            "message": message.into(),
            "error": error,
            "timestamp": Utc::now(),
        })),
    )
        .into_response()
}
