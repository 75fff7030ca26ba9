//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite connection pool and migrations
//! - Post and user queries behind the `PostStore` / `UserStore` traits

mod database;
mod models;
mod posts;
mod store;
mod users;

pub use database::Database;
pub use models::*;
pub use store::{PostStore, QUERY_TIMEOUT, StoreError, UserStore};

#[cfg(test)]
pub use store::{MockPostStore, MockUserStore};

#[cfg(test)]
mod database_test;
