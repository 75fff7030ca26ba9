//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate the stores and photo storage.

mod account;
mod post;

pub use account::AccountService;
pub use post::{MAX_CONTENT_CHARS, MAX_TITLE_CHARS, PostService};
