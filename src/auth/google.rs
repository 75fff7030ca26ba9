//! Google OAuth 2.0 provider
//!
//! Authorization code flow against Google's consent, token and userinfo
//! endpoints. All three endpoints come from configuration so tests can
//! point them at a local fake.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;

use super::provider::{OAuthProvider, ProviderSession, ProviderUser};
use crate::config::GoogleOAuthConfig;
use crate::error::AppError;

const PROVIDER_NAME: &str = "google";
const SCOPES: &str = "openid email profile";

pub struct GoogleProvider {
    config: GoogleOAuthConfig,
    http_client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(config: GoogleOAuthConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<i64>,
    id_token: Option<String>,
}

/// Userinfo (v2) response
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    picture: Option<String>,
}

impl From<GoogleUserInfo> for ProviderUser {
    fn from(info: GoogleUserInfo) -> Self {
        ProviderUser {
            provider: PROVIDER_NAME.to_string(),
            user_id: info.id,
            email: info.email,
            name: info.name,
            first_name: info.given_name,
            last_name: info.family_name,
            avatar_url: info.picture,
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn authorize_url(&self, state: &str) -> Result<String, AppError> {
        let url = url::Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Config(format!("invalid auth.google.auth_url: {}", e)))?;

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderSession, AppError> {
        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(%status, "Google token exchange rejected");
            return Err(AppError::Auth(format!(
                "token exchange failed with status {}",
                status
            )));
        }

        let token: TokenResponse = response.json().await?;

        Ok(ProviderSession {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
            id_token: token.id_token,
        })
    }

    async fn fetch_user(&self, session: &ProviderSession) -> Result<ProviderUser, AppError> {
        let response = self
            .http_client
            .get(&self.config.userinfo_url)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(%status, "Google userinfo request rejected");
            return Err(AppError::Auth(format!(
                "userinfo request failed with status {}",
                status
            )));
        }

        let info: GoogleUserInfo = response.json().await?;
        if info.email.is_empty() {
            return Err(AppError::Auth("provider returned no email".to_string()));
        }

        Ok(info.into())
    }
}
