//! Postboard - a small posts API with OAuth cookie sessions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  HTTP Transport (Axum)                       │
//! │  - Routing, CORS, gzip, timeout, request id, panic recovery │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────────────────────┐ ┌────────────────────────────┐
//! │   API + Service Layer        │ │  Auth Provider Adapter     │
//! │  - Post handlers/validation  │ │  - OAuth (Google)          │
//! │  - Post context middleware   │ │  - Encrypted cookie session│
//! └──────────────────────────────┘ └────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx), per-query timeout                         │
//! │  - Local photo storage served under /public                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for posts, health and metrics
//! - `auth`: OAuth providers, sessions, auth middleware
//! - `service`: Business logic layer
//! - `data`: Database layer
//! - `storage`: Photo storage
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Post operations
    pub posts: Arc<service::PostService>,

    /// Local accounts created from OAuth logins
    pub accounts: Arc<service::AccountService>,

    /// OAuth providers by name
    pub providers: Arc<auth::ProviderRegistry>,

    /// Keys for the session and OAuth state cookies
    pub session_keys: Arc<auth::SessionKeys>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database and run migrations
    /// 2. Derive cookie keys from the session secret
    /// 3. Register OAuth providers
    /// 4. Wire services to the stores
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database).await?);
        tracing::info!("Database connected");

        // 2. Cookie keys
        let session_keys = auth::SessionKeys::derive(&config.auth.session_secret)?;

        // 3. OAuth providers
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("Postboard/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        let mut providers = auth::ProviderRegistry::new();
        providers.register(Arc::new(auth::GoogleProvider::new(
            config.auth.google.clone(),
            http_client,
        )));
        tracing::info!(
            providers = ?providers.names().collect::<Vec<_>>(),
            "OAuth providers registered"
        );

        // 4. Services
        let photos = Arc::new(storage::PhotoStorage::new(
            config.storage.public_dir.clone(),
        ));
        let post_store: Arc<dyn data::PostStore> = db.clone();
        let user_store: Arc<dyn data::UserStore> = db.clone();
        let posts = service::PostService::new(
            post_store,
            photos,
            config.posts.default_author_email.clone(),
        );
        let accounts = service::AccountService::new(user_store);

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            posts: Arc::new(posts),
            accounts: Arc::new(accounts),
            providers: Arc::new(providers),
            session_keys: Arc::new(session_keys),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{
        catch_panic::CatchPanicLayer,
        compression::CompressionLayer,
        request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
        services::ServeDir,
        timeout::TimeoutLayer,
        trace::TraceLayer,
    };

    let cors_layer = build_cors_layer(&state.config.server);
    let public_dir = ServeDir::new(&state.config.storage.public_dir);

    Router::new()
        .merge(api::health_router())
        .merge(auth::auth_router(state.clone()))
        .merge(api::posts_router(state.clone()))
        .merge(api::metrics_router(state.clone()))
        .nest_service(storage::PUBLIC_URL_PREFIX, public_dir)
        .layer(TimeoutLayer::new(state.config.server.request_timeout()))
        .layer(cors_layer)
        .layer(CompressionLayer::new())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method, header};
    use tower_http::cors::{AllowOrigin, CorsLayer};

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(%error, %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
