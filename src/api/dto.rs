//! Request and response DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::ProviderUser;
use crate::data::User;
use crate::service::{MAX_CONTENT_CHARS, MAX_TITLE_CHARS};

/// Body of `POST /v1/post`
///
/// Missing fields deserialize as empty strings so they fail validation
/// (422) rather than parsing (400).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = MAX_TITLE_CHARS, message = "title must be 1-100 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = MAX_CONTENT_CHARS,
        message = "content must be 1-1000 characters"
    ))]
    pub content: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub version: String,
    pub status: String,
    pub env: String,
}

/// Logout response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
    pub provider: String,
}

/// Current session profile with the matching local account, if any
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub user: ProviderUser,
    pub account: Option<User>,
}
