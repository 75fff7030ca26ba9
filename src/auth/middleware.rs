//! Authentication middleware
//!
//! Protects routes that require a logged-in user.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::provider::ProviderUser;
use super::session::{SESSION_COOKIE, open_session};
use crate::AppState;
use crate::error::AppError;

/// Resolve the logged-in user from the session cookie
///
/// Returns the profile cached in the session; only sessions without one
/// cost a round-trip to the provider.
///
/// # Errors
/// [`AppError::NotAuthenticated`] for a missing, undecryptable or expired
/// session, an unknown provider, or a failed provider lookup
pub async fn get_user_from_session(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<ProviderUser, AppError> {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(SESSION_COOKIE).ok_or(AppError::NotAuthenticated)?;
    let session = open_session(cookie.value(), &state.session_keys)?;

    let user = match session.user {
        Some(user) => user,
        None => {
            let provider = state
                .providers
                .get(&session.provider)
                .ok_or(AppError::NotAuthenticated)?;
            provider
                .fetch_user(&session.provider_session)
                .await
                .map_err(|error| {
                    tracing::debug!(%error, "Provider rejected stored session");
                    AppError::NotAuthenticated
                })?
        }
    };

    if user.user_id.is_empty() {
        return Err(AppError::NotAuthenticated);
    }

    Ok(user)
}

/// Login entry point visitors are sent to
pub fn login_path(state: &AppState) -> String {
    format!("/v1/auth/{}", state.config.auth.default_provider)
}

/// Middleware to require authentication
///
/// Adds the [`ProviderUser`] to request extensions when the session is
/// valid; otherwise redirects (307) to the login entry point.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/v1/auth/me", ...)
///     .route_layer(middleware::from_fn_with_state(state, require_auth));
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match get_user_from_session(request.headers(), &state).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(_) => {
            tracing::debug!(path = %request.uri().path(), "No session, redirecting to login");
            Redirect::temporary(&login_path(&state)).into_response()
        }
    }
}

/// Extractor for current authenticated user
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", user.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub ProviderUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<ProviderUser>().cloned() {
            return Ok(CurrentUser(user));
        }

        let state = AppState::from_ref(state);
        let user = get_user_from_session(&parts.headers, &state).await?;
        parts.extensions.insert(user.clone());

        Ok(CurrentUser(user))
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of error.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<ProviderUser>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<ProviderUser>().cloned() {
            return Ok(MaybeUser(Some(user)));
        }

        let state = AppState::from_ref(state);
        let user = get_user_from_session(&parts.headers, &state).await.ok();

        if let Some(user) = &user {
            parts.extensions.insert(user.clone());
        }

        Ok(MaybeUser(user))
    }
}
