//! Storage module
//!
//! Local filesystem storage for post photos.

mod uploads;

pub use uploads::{MAX_PHOTO_BYTES, PUBLIC_URL_PREFIX, PhotoStorage, PhotoUpload};
