//! OAuth provider seam
//!
//! Handlers only ever talk to [`OAuthProvider`]; concrete providers are
//! registered by name in a [`ProviderRegistry`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Tokens issued by a provider after the code exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub id_token: Option<String>,
}

/// Profile of the authenticated user as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderUser {
    pub provider: String,
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

impl ProviderUser {
    /// Username stored for a new local account
    ///
    /// First name, then full name, then the local part of the email.
    pub fn preferred_username(&self) -> String {
        [self.first_name.trim(), self.name.trim()]
            .into_iter()
            .find(|candidate| !candidate.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| {
                self.email
                    .split('@')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
    }
}

/// An OAuth 2.0 authorization-code provider
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Lower-case provider name used in routes and sessions
    fn name(&self) -> &str;

    /// Consent screen URL carrying `state`
    fn authorize_url(&self, state: &str) -> Result<String, AppError>;

    /// Exchange an authorization code for tokens
    async fn exchange_code(&self, code: &str) -> Result<ProviderSession, AppError>;

    /// Fetch the profile belonging to `session`
    async fn fetch_user(&self, session: &ProviderSession) -> Result<ProviderUser, AppError>;
}

/// Providers available to the auth routes, keyed by lower-cased name
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn OAuthProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn OAuthProvider>) {
        self.providers
            .insert(provider.name().to_ascii_lowercase(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn OAuthProvider>> {
        self.providers.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}
