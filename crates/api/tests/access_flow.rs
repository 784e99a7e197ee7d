use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{header, StatusCode};

use taskgate_api::app::build_app;
use taskgate_api::identity::InMemoryDirectory;
use taskgate_api::transport::{ACCESS_COOKIE, REFRESH_COOKIE};
use taskgate_audit::MemoryAuditSink;
use taskgate_auth::{AuthConfig, Principal, Role, TokenPair, TokenService};
use taskgate_core::UserId;

struct TestServer {
    base_url: String,
    tokens: Arc<TokenService>,
    directory: Arc<InMemoryDirectory>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = AuthConfig::new("test-access-secret", "test-refresh-secret")
            .expect("config");
        let tokens = Arc::new(TokenService::new(&config));
        let directory = Arc::new(InMemoryDirectory::new());
        let audit = Arc::new(MemoryAuditSink::new());

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(config, directory.clone(), audit);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            base_url,
            tokens,
            directory,
            handle,
        }
    }

    /// Register an identity and mint a token pair for it.
    async fn login(&self, email: &str, role: Role) -> (Principal, TokenPair) {
        let principal = Principal::new(UserId::new(), email, role);
        self.directory.upsert(principal.clone()).await;
        let pair = self.tokens.issue_pair(&principal).expect("issue pair");
        (principal, pair)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn set_cookies(res: &reqwest::Response) -> Vec<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn me_without_credential_is_unauthorized() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/auth/me", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["details"]["tokenExpired"], false);
}

#[tokio::test]
async fn me_with_bearer_token_returns_principal() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (principal, pair) = server.login("alice@example.com", Role::Editor).await;

    let res = client
        .get(format!("{}/auth/me", server.base_url))
        .bearer_auth(&pair.access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["principal"]["email"], principal.email);
    assert_eq!(body["data"]["principal"]["role"], "editor");
}

#[tokio::test]
async fn me_with_access_cookie_works() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, pair) = server.login("alice@example.com", Role::Viewer).await;

    let res = client
        .get(format!("{}/auth/me", server.base_url))
        .header(header::COOKIE, format!("{ACCESS_COOKIE}={}", pair.access))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_token_is_flagged_for_refresh() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let principal = Principal::new(UserId::new(), "late@example.com", Role::Viewer);
    let stale = server
        .tokens
        .issue_pair_at(&principal, Utc::now() - ChronoDuration::minutes(16))
        .unwrap();

    let res = client
        .get(format!("{}/auth/me", server.base_url))
        .bearer_auth(&stale.access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["details"]["tokenExpired"], true);
}

#[tokio::test]
async fn token_signed_with_wrong_secret_is_rejected() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let now = Utc::now();
    let claims = taskgate_auth::AccessClaims {
        id: UserId::new(),
        email: "forger@example.com".to_string(),
        role: "admin".to_string(),
        iat: now.timestamp(),
        exp: (now + ChronoDuration::minutes(15)).timestamp(),
    };
    let forged = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();

    let res = client
        .get(format!("{}/auth/me", server.base_url))
        .bearer_auth(&forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["details"]["tokenExpired"], false);
}

#[tokio::test]
async fn refresh_rotates_and_rejects_reuse() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, pair) = server.login("bob@example.com", Role::Manager).await;
    let refresh_cookie = format!("{REFRESH_COOKIE}={}", pair.refresh);

    let res = client
        .post(format!("{}/auth/refresh", server.base_url))
        .header(header::COOKIE, &refresh_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let cookies = set_cookies(&res);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with(ACCESS_COOKIE)));
    assert!(cookies.iter().any(|c| c.starts_with(REFRESH_COOKIE)));

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["tokenRotation"]["rotated"], true);
    let new_access = body["data"]["accessToken"].as_str().unwrap();
    assert_ne!(new_access, pair.access);

    // The consumed token is rejected the second time.
    let res = client
        .post(format!("{}/auth/refresh", server.base_url))
        .header(header::COOKIE, &refresh_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "REFRESH_INVALID");
}

#[tokio::test]
async fn refresh_ignores_authorization_header() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, pair) = server.login("bob@example.com", Role::Manager).await;

    // Refresh token in the bearer slot, no cookie: refused.
    let res = client
        .post(format!("{}/auth/refresh", server.base_url))
        .bearer_auth(&pair.refresh)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "REFRESH_INVALID");
}

#[tokio::test]
async fn refresh_fails_for_deleted_identity() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (principal, pair) = server.login("gone@example.com", Role::Editor).await;
    server.directory.remove(principal.id).await;

    let res = client
        .post(format!("{}/auth/refresh", server.base_url))
        .header(header::COOKIE, format!("{REFRESH_COOKIE}={}", pair.refresh))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "REFRESH_INVALID");
}

#[tokio::test]
async fn refresh_picks_up_role_change() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (principal, pair) = server.login("promoted@example.com", Role::Viewer).await;

    // Promotion lands on the next rotation.
    server
        .directory
        .upsert(Principal::new(principal.id, &principal.email, Role::Manager))
        .await;

    let res = client
        .post(format!("{}/auth/refresh", server.base_url))
        .header(header::COOKIE, format!("{REFRESH_COOKIE}={}", pair.refresh))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["principal"]["role"], "manager");
}

#[tokio::test]
async fn logout_clears_both_cookies() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/logout", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let cookies = set_cookies(&res);
    assert_eq!(cookies.len(), 2);
    for cookie in cookies {
        assert!(cookie.contains("Max-Age=0"), "not cleared: {cookie}");
    }
}

#[tokio::test]
async fn audit_log_requires_permission() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, viewer) = server.login("viewer@example.com", Role::Viewer).await;
    let (_, admin) = server.login("admin@example.com", Role::Admin).await;

    let res = client
        .get(format!("{}/audit", server.base_url))
        .bearer_auth(&viewer.access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let res = client
        .get(format!("{}/audit?denied_only=true", server.base_url))
        .bearer_auth(&admin.access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The viewer's denial above shows up in the trail.
    let body: serde_json::Value = res.json().await.unwrap();
    let entries = body["data"]["entries"].as_array().unwrap();
    assert!(entries
        .iter()
        .any(|e| e["actor_email"] == "viewer@example.com" && e["allowed"] == false));
}

#[tokio::test]
async fn concurrent_refreshes_share_one_rotation() {
    let server = TestServer::spawn().await;
    let (_, pair) = server.login("racer@example.com", Role::Editor).await;
    let refresh_cookie = format!("{REFRESH_COOKIE}={}", pair.refresh);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = reqwest::Client::new();
        let url = format!("{}/auth/refresh", server.base_url);
        let cookie = refresh_cookie.clone();
        handles.push(tokio::spawn(async move {
            let res = client
                .post(url)
                .header(header::COOKIE, cookie)
                .send()
                .await
                .unwrap();
            let status = res.status();
            let body: serde_json::Value = res.json().await.unwrap();
            (status, body)
        }));
    }

    // Collapsed requests share the rotation; a request arriving after the
    // flight resolved is rejected by the single-use registry instead. Either
    // way exactly one distinct pair is ever minted.
    let mut access_tokens = Vec::new();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        match status {
            StatusCode::OK => {
                access_tokens.push(body["data"]["accessToken"].as_str().unwrap().to_string());
            }
            StatusCode::UNAUTHORIZED => {
                assert_eq!(body["error"]["code"], "REFRESH_INVALID");
            }
            other => panic!("unexpected status {other}"),
        }
    }

    assert!(!access_tokens.is_empty());
    access_tokens.sort();
    access_tokens.dedup();
    assert_eq!(access_tokens.len(), 1);
}
