//! OAuth authentication
//!
//! Handles:
//! - Provider seam and the Google provider
//! - Cookie-held sessions (encrypted) and OAuth state (signed)
//! - Authentication middleware and extractors

mod google;
mod middleware;
mod oauth;
mod provider;
pub mod session;

pub use google::GoogleProvider;
pub use middleware::{CurrentUser, MaybeUser, get_user_from_session, login_path, require_auth};
pub use oauth::{CallbackQuery, auth_router, complete_auth};
pub use provider::{OAuthProvider, ProviderRegistry, ProviderSession, ProviderUser};
pub use session::{Session, SessionKeys};
