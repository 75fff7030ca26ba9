//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub posts: PostsConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Environment name reported by the health endpoint ("development", "production")
    pub env: String,
    /// Origins allowed to make credentialed cross-origin requests
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whole-request deadline in seconds
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string (e.g. "sqlite://data/postboard.db?mode=rwc")
    pub url: String,
    /// Maximum open connections in the pool
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// Close connections idle for longer than this many seconds
    pub idle_timeout_secs: u64,
    /// Recycle connections older than this many seconds
    pub max_lifetime_secs: u64,
}

/// Authentication configuration (OAuth + cookie sessions)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
    /// Provider used when the auth middleware sends a visitor to log in
    pub default_provider: String,
    /// Where the duplicate-account redirect points
    pub after_login_url: String,
    /// Put post create/edit/delete behind the auth middleware
    #[serde(default)]
    pub require_login_for_writes: bool,
    pub google: GoogleOAuthConfig,
}

/// Google OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with Google
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

/// Local file storage for uploaded photos
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory served under `/public`
    pub public_dir: PathBuf,
}

/// Post defaults
#[derive(Debug, Clone, Deserialize)]
pub struct PostsConfig {
    /// Author recorded for posts created without a session
    pub default_author_email: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (POSTBOARD__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.env", "development")?
            .set_default(
                "server.cors_origins",
                vec![
                    "http://localhost:3000",
                    "http://0.0.0.0:3000",
                    "http://localhost:5173",
                ],
            )?
            .set_default("server.request_timeout_secs", 60)?
            .set_default("database.url", "sqlite://data/postboard.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 10)?
            .set_default("database.idle_timeout_secs", 900)?
            .set_default("database.max_lifetime_secs", 900)?
            .set_default("auth.session_max_age", 604800)?
            .set_default("auth.default_provider", "google")?
            .set_default("auth.after_login_url", "/")?
            .set_default("auth.require_login_for_writes", false)?
            .set_default("auth.google.client_id", "")?
            .set_default("auth.google.client_secret", "")?
            .set_default(
                "auth.google.redirect_url",
                "http://localhost:3000/auth/google/callback",
            )?
            .set_default(
                "auth.google.auth_url",
                "https://accounts.google.com/o/oauth2/v2/auth",
            )?
            .set_default("auth.google.token_url", "https://oauth2.googleapis.com/token")?
            .set_default(
                "auth.google.userinfo_url",
                "https://www.googleapis.com/oauth2/v2/userinfo",
            )?
            .set_default("storage.public_dir", "public")?
            .set_default("posts.default_author_email", "")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (POSTBOARD__*)
            .add_source(
                Environment::with_prefix("POSTBOARD")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.is_production()
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(crate::error::AppError::Config(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(crate::error::AppError::Config(
                "database.min_connections must not exceed database.max_connections".to_string(),
            ));
        }

        Ok(())
    }

    /// Log settings that are valid but probably unintended
    ///
    /// Called once logging is up, since `load` runs before the subscriber exists.
    pub fn log_warnings(&self) {
        if self.auth.google.client_id.is_empty() {
            tracing::warn!("auth.google.client_id is empty; Google login will fail");
        }

        if !self.should_use_secure_cookies() {
            tracing::warn!(
                env = %self.server.env,
                "Using insecure session cookies outside production"
            );
        }

        if self.posts.default_author_email.is_empty() && !self.auth.require_login_for_writes {
            tracing::warn!("posts.default_author_email is empty; anonymous posts have no author");
        }
    }
}
