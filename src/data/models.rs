//! Data models
//!
//! Rust structs representing database entities.
//! IDs are database-assigned integers and timestamps use chrono.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Post
// =============================================================================

/// A post
///
/// `id` and `created_at` are assigned by the store on insert and never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_email: String,
    pub created_at: DateTime<Utc>,
    /// Public path of the attached photo, empty when there is none
    pub photo_url: String,
}

/// Fields supplied by the caller when creating a post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_email: String,
}

// =============================================================================
// User
// =============================================================================

/// A local account, created on the first OAuth login for an email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
