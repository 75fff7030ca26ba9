//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Duration, Utc};
use postboard::auth::session::{SESSION_COOKIE, seal_session};
use postboard::auth::{ProviderSession, ProviderUser, Session};
use postboard::{AppState, config};
use serde::Deserialize;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Profile the fake provider hands out for an authorization code
#[derive(Debug, Clone)]
pub struct FakeProfile {
    pub id: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
}

impl FakeProfile {
    pub fn new(first_name: &str, email: &str) -> Self {
        Self {
            id: format!("google-{}", email),
            email: email.to_string(),
            given_name: first_name.to_string(),
            family_name: "Tester".to_string(),
        }
    }
}

#[derive(Default)]
struct FakeProviderState {
    profiles: Mutex<HashMap<String, FakeProfile>>,
    userinfo_calls: AtomicUsize,
}

/// Google look-alike serving the token and userinfo endpoints
#[derive(Clone)]
pub struct FakeProvider {
    pub base_url: String,
    state: Arc<FakeProviderState>,
}

impl FakeProvider {
    async fn start() -> Self {
        let state = Arc::new(FakeProviderState::default());

        let app = Router::new()
            .route("/token", post(fake_token))
            .route("/userinfo", get(fake_userinfo))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Make `code` exchangeable for a token that resolves to `profile`
    pub fn add_profile(&self, code: &str, profile: FakeProfile) {
        self.state
            .profiles
            .lock()
            .unwrap()
            .insert(code.to_string(), profile);
    }

    pub fn userinfo_calls(&self) -> usize {
        self.state.userinfo_calls.load(Ordering::SeqCst)
    }
}

#[derive(Deserialize)]
struct TokenForm {
    code: String,
    grant_type: String,
    client_id: String,
}

async fn fake_token(
    State(state): State<Arc<FakeProviderState>>,
    Form(form): Form<TokenForm>,
) -> Response {
    let known = state.profiles.lock().unwrap().contains_key(&form.code);
    if !known || form.grant_type != "authorization_code" || form.client_id != "test-client-id" {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }

    Json(serde_json::json!({
        "access_token": format!("token-{}", form.code),
        "token_type": "Bearer",
        "expires_in": 3599,
        "id_token": "fake-id-token",
    }))
    .into_response()
}

async fn fake_userinfo(State(state): State<Arc<FakeProviderState>>, headers: HeaderMap) -> Response {
    state.userinfo_calls.fetch_add(1, Ordering::SeqCst);

    let code = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer token-"))
        .map(ToOwned::to_owned);
    let profile = code.and_then(|code| state.profiles.lock().unwrap().get(&code).cloned());

    match profile {
        Some(profile) => Json(serde_json::json!({
            "id": profile.id,
            "email": profile.email,
            "verified_email": true,
            "name": format!("{} {}", profile.given_name, profile.family_name),
            "given_name": profile.given_name,
            "family_name": profile.family_name,
            "picture": "https://example.com/avatar.png",
        }))
        .into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub provider: FakeProvider,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
    pub db_url: String,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after adjusting the default test configuration
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        postboard::metrics::init_metrics();

        // Create temporary directory for test database and uploads
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let provider = FakeProvider::start().await;

        // Bind to random port first so the callback URL is known
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: addr.port(),
                env: "test".to_string(),
                cors_origins: vec!["http://localhost:5173".to_string()],
                request_timeout_secs: 60,
            },
            database: config::DatabaseConfig {
                url: db_url.clone(),
                max_connections: 5,
                min_connections: 1,
                idle_timeout_secs: 900,
                max_lifetime_secs: 900,
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
                default_provider: "google".to_string(),
                after_login_url: "/".to_string(),
                require_login_for_writes: false,
                google: config::GoogleOAuthConfig {
                    client_id: "test-client-id".to_string(),
                    client_secret: "test-client-secret".to_string(),
                    redirect_url: format!("{}/auth/google/callback", addr_str),
                    auth_url: format!("{}/authorize", provider.base_url),
                    token_url: format!("{}/token", provider.base_url),
                    userinfo_url: format!("{}/userinfo", provider.base_url),
                },
            },
            storage: config::StorageConfig {
                public_dir: temp_dir.path().join("public"),
            },
            posts: config::PostsConfig {
                default_author_email: "anonymous@example.com".to_string(),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        adjust(&mut config);

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let app = postboard::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            provider,
            _temp_dir: temp_dir,
            client,
            db_url,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Seal a session cookie for `email` without going through the provider
    pub fn session_cookie(&self, email: &str) -> String {
        let now = Utc::now();
        let session = Session {
            provider: "google".to_string(),
            provider_session: ProviderSession {
                access_token: "token-minted".to_string(),
                token_type: Some("Bearer".to_string()),
                expires_at: Some(now + Duration::hours(1)),
                id_token: None,
            },
            user: Some(ProviderUser {
                provider: "google".to_string(),
                user_id: format!("google-{}", email),
                email: email.to_string(),
                name: "Session User".to_string(),
                first_name: "Session".to_string(),
                last_name: "User".to_string(),
                avatar_url: None,
            }),
            created_at: now,
            expires_at: now + Duration::days(7),
        };

        self.seal(&session)
    }

    /// Seal an arbitrary session into a `Cookie` header value
    pub fn seal(&self, session: &Session) -> String {
        let token = seal_session(session, &self.state.session_keys).unwrap();
        format!("{}={}", SESSION_COOKIE, token)
    }

    /// Run the login flow up to the callback response
    ///
    /// `code` must have been registered with [`FakeProvider::add_profile`].
    pub async fn login(&self, code: &str) -> reqwest::Response {
        let begin = self
            .client
            .get(self.url("/v1/auth/google"))
            .send()
            .await
            .unwrap();
        assert_eq!(begin.status(), 307);

        let state_cookie = set_cookie(&begin, "oauth_state").expect("oauth_state cookie");
        let location = begin.headers()["location"].to_str().unwrap().to_string();
        let state = url::Url::parse(&location)
            .unwrap()
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state parameter");

        self.client
            .get(self.url(&format!(
                "/auth/google/callback?code={}&state={}",
                code, state
            )))
            .header("Cookie", state_cookie)
            .send()
            .await
            .unwrap()
    }

    /// Number of rows in `users`
    pub async fn user_count(&self) -> i64 {
        let pool = sqlx::SqlitePool::connect(&self.db_url).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        pool.close().await;
        count
    }
}

/// `name=value` pair of the `Set-Cookie` header for `name`, if present
pub fn set_cookie(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&prefix))
        .map(|value| value.split(';').next().unwrap_or_default().to_string())
}

/// Full `Set-Cookie` header for `name`, attributes included
pub fn set_cookie_header(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&prefix))
        .map(ToOwned::to_owned)
}
