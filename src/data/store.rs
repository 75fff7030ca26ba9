//! Store abstractions
//!
//! Handlers and services depend on these traits rather than on the
//! concrete SQLite adapter, so each entity's persistence can be swapped
//! or mocked independently.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

use super::models::{NewPost, Post, User};

/// Deadline applied to every individual query
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Store-level error kinds
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("user with this email already exists")]
    DuplicateUser,

    #[error("query timed out after {}s", QUERY_TIMEOUT.as_secs())]
    Timeout,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Database(other),
        }
    }
}

impl StoreError {
    pub(crate) fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Database(err) => err
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation()),
            _ => false,
        }
    }
}

/// Run one query under [`QUERY_TIMEOUT`] and record its duration.
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    table: &'static str,
    query: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let started = Instant::now();
    let outcome = tokio::time::timeout(QUERY_TIMEOUT, query).await;
    crate::metrics::observe_db_query(operation, table, started.elapsed());

    match outcome {
        Ok(result) => result.map_err(StoreError::from),
        Err(_) => {
            tracing::warn!(operation, table, "Query timed out");
            Err(StoreError::Timeout)
        }
    }
}

/// Persistence for posts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a post; the returned row carries the assigned `id` and `created_at`.
    async fn create(&self, post: NewPost) -> Result<Post, StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Post, StoreError>;

    /// All posts, ordered by id.
    async fn list(&self) -> Result<Vec<Post>, StoreError>;

    /// Persist `content` and `photo_url` of an existing post.
    async fn edit(&self, post: &Post) -> Result<Post, StoreError>;

    /// Fails with [`StoreError::NotFound`] when no row was removed.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

/// Persistence for user accounts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::DuplicateUser`] when the email is taken.
    async fn create_user(&self, username: &str, email: &str) -> Result<User, StoreError>;

    async fn get_user_by_id(&self, id: i64) -> Result<User, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;
}
