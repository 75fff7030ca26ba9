//! Local photo storage
//!
//! Post photos are written to `storage.public_dir`, which the router
//! serves under `/public`. File names are generated here; the client's
//! filename never reaches the filesystem.

use std::path::{Path, PathBuf};

use rand::RngCore;

use crate::error::AppError;
use crate::metrics::PHOTO_UPLOADS_TOTAL;

/// Largest photo accepted for a post
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// URL prefix the public directory is mounted at
pub const PUBLIC_URL_PREFIX: &str = "/public";

/// Extension for a supported image content type
fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// A photo received in a multipart form
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Photo storage on the local filesystem
pub struct PhotoStorage {
    public_dir: PathBuf,
}

impl PhotoStorage {
    pub fn new(public_dir: impl Into<PathBuf>) -> Self {
        Self {
            public_dir: public_dir.into(),
        }
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// Store a photo for `post_id`
    ///
    /// # Returns
    /// Public URL of the stored file, e.g. `/public/7-9f86d081884c7d65.png`
    ///
    /// # Errors
    /// [`AppError::Unprocessable`] for empty, oversized or non-image
    /// uploads; [`AppError::Storage`] when the file cannot be written
    pub async fn save(&self, post_id: i64, photo: PhotoUpload) -> Result<String, AppError> {
        let result = self.write(post_id, photo).await;
        let status = if result.is_ok() { "stored" } else { "rejected" };
        PHOTO_UPLOADS_TOTAL.with_label_values(&[status]).inc();
        result
    }

    async fn write(&self, post_id: i64, photo: PhotoUpload) -> Result<String, AppError> {
        if photo.data.is_empty() {
            return Err(AppError::Unprocessable("photo is empty".to_string()));
        }
        if photo.data.len() > MAX_PHOTO_BYTES {
            return Err(AppError::Unprocessable(format!(
                "photo too large: exceeds {} bytes",
                MAX_PHOTO_BYTES
            )));
        }

        let content_type = photo.content_type.trim().to_ascii_lowercase();
        let extension = extension_for_content_type(&content_type).ok_or_else(|| {
            AppError::Unprocessable(format!("unsupported photo type: {}", photo.content_type))
        })?;

        tokio::fs::create_dir_all(&self.public_dir)
            .await
            .map_err(|e| AppError::Storage(format!("failed to create upload directory: {}", e)))?;

        let file_name = format!("{}-{}.{}", post_id, random_suffix(), extension);
        let path = self.public_dir.join(&file_name);
        tokio::fs::write(&path, &photo.data)
            .await
            .map_err(|e| AppError::Storage(format!("failed to write photo: {}", e)))?;

        tracing::info!(
            post_id,
            file = %file_name,
            bytes = photo.data.len(),
            "Stored post photo"
        );

        Ok(format!("{}/{}", PUBLIC_URL_PREFIX, file_name))
    }

    /// Remove a previously stored photo by its public URL
    ///
    /// URLs outside `/public` or with path separators are ignored.
    pub async fn remove(&self, photo_url: &str) -> Result<(), AppError> {
        let Some(file_name) = photo_url
            .strip_prefix(PUBLIC_URL_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return Ok(());
        };
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Ok(());
        }

        match tokio::fs::remove_file(self.public_dir.join(file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("failed to remove photo: {}", e))),
        }
    }
}

fn random_suffix() -> String {
    let mut bytes = [0_u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn png(len: usize) -> PhotoUpload {
        PhotoUpload {
            data: vec![0x89; len],
            content_type: "image/png".to_string(),
        }
    }

    #[tokio::test]
    async fn save_writes_file_with_generated_name() {
        let dir = TempDir::new().unwrap();
        let storage = PhotoStorage::new(dir.path().join("public"));

        let url = storage.save(7, png(16)).await.unwrap();

        assert!(url.starts_with("/public/7-"));
        assert!(url.ends_with(".png"));
        let file_name = url.trim_start_matches("/public/");
        let written = std::fs::read(storage.public_dir().join(file_name)).unwrap();
        assert_eq!(written.len(), 16);
    }

    #[tokio::test]
    async fn two_uploads_never_share_a_name() {
        let dir = TempDir::new().unwrap();
        let storage = PhotoStorage::new(dir.path());

        let first = storage.save(1, png(4)).await.unwrap();
        let second = storage.save(1, png(4)).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn rejects_non_images_and_oversized_files() {
        let dir = TempDir::new().unwrap();
        let storage = PhotoStorage::new(dir.path());

        let script = PhotoUpload {
            data: b"#!/bin/sh".to_vec(),
            content_type: "text/x-shellscript".to_string(),
        };
        assert!(matches!(
            storage.save(1, script).await,
            Err(AppError::Unprocessable(_))
        ));
        assert!(matches!(
            storage.save(1, png(MAX_PHOTO_BYTES + 1)).await,
            Err(AppError::Unprocessable(_))
        ));
        assert!(matches!(
            storage.save(1, png(0)).await,
            Err(AppError::Unprocessable(_))
        ));
    }

    #[tokio::test]
    async fn remove_deletes_stored_file_and_ignores_foreign_paths() {
        let dir = TempDir::new().unwrap();
        let storage = PhotoStorage::new(dir.path());

        let url = storage.save(3, png(8)).await.unwrap();
        storage.remove(&url).await.unwrap();
        let file_name = url.trim_start_matches("/public/");
        assert!(!dir.path().join(file_name).exists());

        storage.remove("/public/../secret").await.unwrap();
        storage.remove("https://cdn.example/x.png").await.unwrap();
        storage.remove(&url).await.unwrap();
    }
}
