//! Credential transport: where a token travels and how it is protected
//! in transit, independent of its cryptographic contents.
//!
//! The access token rides a SameSite=Lax cookie (top-level navigations still
//! carry it) or a bearer header; the refresh token rides a SameSite=Strict
//! cookie only, so it never leaves via a cross-site form submission. Both
//! cookies are HttpOnly unconditionally so script can never read them.

use axum::http::{header, HeaderMap};
use cookie::{Cookie, SameSite};

use taskgate_auth::AuthConfig;

/// Cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "accessToken";

/// Cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Transport attributes for a credential cookie.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub max_age_seconds: i64,
    pub path: &'static str,
    pub same_site: SameSite,
    pub secure: bool,
    pub domain: Option<String>,
}

/// Render a credential cookie as a `Set-Cookie` header value.
///
/// HttpOnly is always set; `Secure` is controlled by the policy (omitted
/// only in non-TLS development).
pub fn encode_cookie(name: &str, value: &str, policy: &CookiePolicy) -> String {
    let mut builder = Cookie::build((name, value))
        .http_only(true)
        .path(policy.path)
        .same_site(policy.same_site)
        .max_age(cookie::time::Duration::seconds(policy.max_age_seconds));

    if policy.secure {
        builder = builder.secure(true);
    }
    if let Some(domain) = &policy.domain {
        builder = builder.domain(domain.clone());
    }

    builder.build().to_string()
}

/// Policy for the access-token cookie: Lax, lifetime = access TTL.
pub fn access_policy(config: &AuthConfig) -> CookiePolicy {
    CookiePolicy {
        max_age_seconds: config.access_ttl_seconds as i64,
        path: "/",
        same_site: SameSite::Lax,
        secure: config.require_secure_cookies,
        domain: config.cookie_domain.clone(),
    }
}

/// Policy for the refresh-token cookie: Strict, lifetime = refresh TTL.
pub fn refresh_policy(config: &AuthConfig) -> CookiePolicy {
    CookiePolicy {
        max_age_seconds: config.refresh_ttl_seconds as i64,
        path: "/",
        same_site: SameSite::Strict,
        secure: config.require_secure_cookies,
        domain: config.cookie_domain.clone(),
    }
}

pub fn access_cookie(config: &AuthConfig, token: &str) -> String {
    encode_cookie(ACCESS_COOKIE, token, &access_policy(config))
}

pub fn refresh_cookie(config: &AuthConfig, token: &str) -> String {
    encode_cookie(REFRESH_COOKIE, token, &refresh_policy(config))
}

/// `Set-Cookie` values that clear both credential cookies (logout).
pub fn clear_credentials(config: &AuthConfig) -> [String; 2] {
    let mut access = access_policy(config);
    access.max_age_seconds = 0;
    let mut refresh = refresh_policy(config);
    refresh.max_age_seconds = 0;

    [
        encode_cookie(ACCESS_COOKIE, "", &access),
        encode_cookie(REFRESH_COOKIE, "", &refresh),
    ]
}

/// Extract the access credential from a request.
///
/// Precedence: an explicit bearer header beats the cookie, so non-browser
/// clients can bypass cookie semantics entirely.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        return Some(token.to_string());
    }
    cookie_value(headers, ACCESS_COOKIE)
}

/// Extract a bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Find a cookie by name across all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(header::COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for cookie in Cookie::split_parse(raw) {
            let Ok(cookie) = cookie else { continue };
            if cookie.name() == name {
                return Some(cookie.value().to_string());
            }
        }
    }
    None
}
