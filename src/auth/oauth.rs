//! OAuth flow
//!
//! Authorization code flow against any registered [`OAuthProvider`]:
//! - GET /v1/auth/:provider            - redirect to the consent screen
//! - GET /auth/:provider/callback      - finish login, set session cookie
//! - GET /v1/auth/logout/:provider     - drop the session cookie
//! - GET /v1/auth/me                   - current session profile

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use serde::Deserialize;

use super::middleware::{CurrentUser, require_auth};
use super::provider::{OAuthProvider, ProviderUser};
use super::session::{
    OAuthState, STATE_COOKIE, SESSION_COOKIE, STATE_MAX_AGE_SECS, Session, build_session_cookie,
    build_state_cookie, clear_cookie, generate_state, seal_session, sign_state, verify_state,
};
use crate::AppState;
use crate::api::{LogoutResponse, MeResponse};
use crate::error::AppError;
use crate::metrics::AUTH_EVENTS_TOTAL;

/// Create authentication router
pub fn auth_router(state: AppState) -> Router<AppState> {
    let me = Router::new()
        .route("/v1/auth/me", get(current_user))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/v1/auth/:provider", get(begin_auth))
        .route("/auth/:provider/callback", get(auth_callback))
        .route("/v1/auth/logout/:provider", get(logout))
        .merge(me)
}

fn record(provider: &str, event: &str) {
    AUTH_EVENTS_TOTAL.with_label_values(&[provider, event]).inc();
}

// =============================================================================
// BeginAuth
// =============================================================================

/// GET /v1/auth/:provider
///
/// Stores a fresh CSRF state in the signed state cookie and redirects
/// (307) to the provider's consent screen.
async fn begin_auth(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let provider = state.providers.get(&provider).ok_or(AppError::NotFound)?;

    let oauth_state = OAuthState {
        provider: provider.name().to_string(),
        state: generate_state(),
        expires_at: Utc::now() + Duration::seconds(STATE_MAX_AGE_SECS),
    };
    let token = sign_state(&oauth_state, &state.session_keys)?;
    let authorize_url = provider.authorize_url(&oauth_state.state)?;

    record(provider.name(), "begin");
    tracing::debug!(provider = provider.name(), "Redirecting to OAuth consent screen");

    let cookie = build_state_cookie(token, state.config.should_use_secure_cookies());
    Ok((jar.add(cookie), Redirect::temporary(&authorize_url)))
}

// =============================================================================
// CompleteAuth
// =============================================================================

/// Query parameters from the provider callback
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code
    pub code: Option<String>,
    /// CSRF state token
    pub state: Option<String>,
    /// Set by the provider when the user denied consent
    pub error: Option<String>,
}

/// Finish the authorization code flow
///
/// Verifies `state` against the state cookie, exchanges the code and
/// fetches the profile. Every failure is an [`AppError::Auth`], including
/// an unreachable provider or an unreadable provider response.
pub async fn complete_auth(
    state: &AppState,
    provider: &dyn OAuthProvider,
    query: &CallbackQuery,
    jar: &CookieJar,
) -> Result<Session, AppError> {
    if let Some(error) = &query.error {
        return Err(AppError::Auth(format!("provider returned error: {}", error)));
    }

    let cookie = jar
        .get(STATE_COOKIE)
        .ok_or_else(|| AppError::Auth("missing oauth state".to_string()))?;
    let expected = verify_state(cookie.value(), &state.session_keys)
        .map_err(|e| AppError::Auth(format!("invalid oauth state: {}", e)))?;

    if expected.provider != provider.name() {
        return Err(AppError::Auth("oauth state belongs to another provider".to_string()));
    }
    if query.state.as_deref() != Some(expected.state.as_str()) {
        return Err(AppError::Auth("oauth state mismatch".to_string()));
    }

    let code = query
        .code
        .as_deref()
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::Auth("missing authorization code".to_string()))?;

    let provider_session = provider
        .exchange_code(code)
        .await
        .map_err(provider_failure)?;
    let user = provider
        .fetch_user(&provider_session)
        .await
        .map_err(provider_failure)?;

    let now = Utc::now();
    Ok(Session {
        provider: provider.name().to_string(),
        provider_session,
        user: Some(user),
        created_at: now,
        expires_at: now + Duration::seconds(state.config.auth.session_max_age),
    })
}

/// Any provider failure during the callback is an authentication failure
fn provider_failure(error: AppError) -> AppError {
    match error {
        AppError::Auth(_) => error,
        other => AppError::Auth(format!("provider request failed: {}", other)),
    }
}

/// GET /auth/:provider/callback
///
/// On success sets the session cookie, records a local account for the
/// email and returns the profile. An email that already has an account
/// keeps the new session and answers 307 to `auth.after_login_url`.
async fn auth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let provider = state.providers.get(&provider).ok_or(AppError::NotFound)?;

    let session = match complete_auth(&state, provider.as_ref(), &query, &jar).await {
        Ok(session) => session,
        Err(error) => {
            record(provider.name(), "failure");
            tracing::warn!(provider = provider.name(), %error, "OAuth callback rejected");
            return Ok((jar.add(clear_cookie(STATE_COOKIE)), error).into_response());
        }
    };

    let user: ProviderUser = session
        .user
        .clone()
        .ok_or_else(|| AppError::Auth("provider returned no profile".to_string()))?;

    let sealed = seal_session(&session, &state.session_keys)?;
    let jar = jar
        .add(build_session_cookie(
            sealed,
            state.config.should_use_secure_cookies(),
            state.config.auth.session_max_age,
        ))
        .add(clear_cookie(STATE_COOKIE));

    match state.accounts.register(&user).await {
        Ok(account) => {
            record(provider.name(), "login");
            tracing::info!(user_id = account.id, email = %account.email, "New account registered");
            Ok((jar, Json(user)).into_response())
        }
        Err(AppError::DuplicateUser) => {
            record(provider.name(), "returning");
            tracing::info!(email = %user.email, "Returning user logged in");
            let location = [(header::LOCATION, state.config.auth.after_login_url.clone())];
            Ok((jar, location, AppError::DuplicateUser).into_response())
        }
        Err(error) => Err(error),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// GET /v1/auth/logout/:provider
///
/// Expires the session cookie. The provider is echoed back, not checked.
async fn logout(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(registered) = state.providers.get(&provider) {
        record(registered.name(), "logout");
    }

    let jar = jar
        .add(clear_cookie(SESSION_COOKIE))
        .add(clear_cookie(STATE_COOKIE));

    (
        jar,
        Json(LogoutResponse {
            message: "logged out".to_string(),
            provider,
        }),
    )
}

// =============================================================================
// Current user
// =============================================================================

/// GET /v1/auth/me
async fn current_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MeResponse>, AppError> {
    let account = match state.accounts.find_by_email(&user.email).await {
        Ok(account) => Some(account),
        Err(AppError::NotFound) => None,
        Err(error) => return Err(error),
    };

    Ok(Json(MeResponse { user, account }))
}
