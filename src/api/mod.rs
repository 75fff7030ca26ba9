//! API layer
//!
//! HTTP handlers for:
//! - Health check
//! - Posts
//! - Metrics (Prometheus)
//!
//! Auth routes live in [`crate::auth`].

mod dto;
mod health;
pub mod metrics;
mod posts;

pub use dto::*;

pub use health::health_router;
pub use metrics::metrics_router;
pub use posts::{PostContext, post_context, posts_router};
