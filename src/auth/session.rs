//! Session management
//!
//! The session lives entirely in cookies; there is no server-side store.
//! - `postboard_session`: AES-256-GCM sealed [`Session`] (provider name,
//!   provider tokens, cached profile)
//! - `oauth_state`: HMAC-signed [`OAuthState`] carried between
//!   BeginAuth and the provider callback

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use super::provider::{ProviderSession, ProviderUser};
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "postboard_session";
pub const STATE_COOKIE: &str = "oauth_state";

/// How long a started login may take before the callback is rejected
pub const STATE_MAX_AGE_SECS: i64 = 10 * 60;

const AES_GCM_NONCE_BYTES: usize = 12;

type HmacSha256 = Hmac<Sha256>;

/// Why a cookie could not be turned back into a session or state
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token could not be decrypted")]
    Decrypt,
    #[error("token expired")]
    Expired,
}

impl From<SessionError> for AppError {
    fn from(_: SessionError) -> Self {
        AppError::NotAuthenticated
    }
}

/// Authenticated session stored in the session cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Provider that authenticated this session (e.g. "google")
    pub provider: String,
    /// Tokens issued by the provider
    pub provider_session: ProviderSession,
    /// Profile captured at login; lets requests skip a provider round-trip
    pub user: Option<ProviderUser>,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// CSRF state for an in-flight login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthState {
    pub provider: String,
    pub state: String,
    pub expires_at: DateTime<Utc>,
}

/// Keys derived from `auth.session_secret`
///
/// Encryption and signing use separate keys derived with HMAC-SHA256.
#[derive(Clone)]
pub struct SessionKeys {
    cipher_key: [u8; 32],
    signing_key: [u8; 32],
}

impl SessionKeys {
    pub fn derive(secret: &str) -> Result<Self, AppError> {
        Ok(Self {
            cipher_key: derive_key(secret, b"postboard/session-encryption")?,
            signing_key: derive_key(secret, b"postboard/oauth-state-signing")?,
        })
    }
}

fn derive_key(secret: &str, label: &[u8]) -> Result<[u8; 32], AppError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(label);
    Ok(mac.finalize().into_bytes().into())
}

/// Random URL-safe token used for the OAuth `state` parameter
pub fn generate_state() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

// =============================================================================
// Session cookie (encrypted)
// =============================================================================

/// Encrypt a session into a cookie value
///
/// Token format: base64(nonce || aes256gcm(json(session)))
pub fn seal_session(session: &Session, keys: &SessionKeys) -> Result<String, AppError> {
    let payload = serde_json::to_vec(session).map_err(|e| AppError::Internal(e.into()))?;

    let cipher = Aes256Gcm::new_from_slice(&keys.cipher_key)
        .map_err(|_| AppError::Encryption("invalid session key length".to_string()))?;

    let mut nonce = [0_u8; AES_GCM_NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), payload.as_slice())
        .map_err(|_| AppError::Encryption("session encryption failed".to_string()))?;

    let mut out = Vec::with_capacity(AES_GCM_NONCE_BYTES + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(URL_SAFE_NO_PAD.encode(out))
}

/// Decrypt and validate a session cookie value
///
/// # Errors
/// Returns error if the token is malformed, was tampered with, or has expired
pub fn open_session(token: &str, keys: &SessionKeys) -> Result<Session, SessionError> {
    let data = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| SessionError::Malformed)?;
    if data.len() <= AES_GCM_NONCE_BYTES {
        return Err(SessionError::Malformed);
    }

    let cipher =
        Aes256Gcm::new_from_slice(&keys.cipher_key).map_err(|_| SessionError::Decrypt)?;
    let (nonce, ciphertext) = data.split_at(AES_GCM_NONCE_BYTES);
    let payload = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| SessionError::Decrypt)?;

    let session: Session =
        serde_json::from_slice(&payload).map_err(|_| SessionError::Malformed)?;

    if session.is_expired() {
        return Err(SessionError::Expired);
    }

    Ok(session)
}

// =============================================================================
// OAuth state cookie (signed)
// =============================================================================

/// Create a signed state token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn sign_state(state: &OAuthState, keys: &SessionKeys) -> Result<String, AppError> {
    let payload = serde_json::to_string(state).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = <HmacSha256 as Mac>::new_from_slice(&keys.signing_key)
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a signed state token
pub fn verify_state(token: &str, keys: &SessionKeys) -> Result<OAuthState, SessionError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(SessionError::Malformed)?;

    let mut mac = <HmacSha256 as Mac>::new_from_slice(&keys.signing_key)
        .map_err(|_| SessionError::Malformed)?;
    mac.update(payload_b64.as_bytes());

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| SessionError::Malformed)?;
    mac.verify_slice(&signature)
        .map_err(|_| SessionError::InvalidSignature)?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| SessionError::Malformed)?;
    let state: OAuthState =
        serde_json::from_slice(&payload).map_err(|_| SessionError::Malformed)?;

    if state.expires_at < Utc::now() {
        return Err(SessionError::Expired);
    }

    Ok(state)
}

// =============================================================================
// Cookies
// =============================================================================

/// Session cookie kept by the browser for `max_age_secs`
pub fn build_session_cookie(value: String, secure: bool, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

pub fn build_state_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(STATE_MAX_AGE_SECS))
        .build()
}

/// Removal cookie for `name` (empty value, expired)
pub fn clear_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "".to_string()))
        .path("/")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}
