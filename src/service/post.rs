//! Post service
//!
//! Handles post create, list, edit (content and photo) and delete.

use std::sync::Arc;

use crate::data::{NewPost, Post, PostStore};
use crate::error::AppError;
use crate::metrics::POSTS_TOTAL;
use crate::storage::{PhotoStorage, PhotoUpload};

/// Longest post title, in characters
pub const MAX_TITLE_CHARS: u64 = 100;
/// Longest post content, in characters
pub const MAX_CONTENT_CHARS: u64 = 1000;

/// Post service
pub struct PostService {
    store: Arc<dyn PostStore>,
    photos: Arc<PhotoStorage>,
    default_author_email: String,
}

impl PostService {
    /// Create new post service
    pub fn new(
        store: Arc<dyn PostStore>,
        photos: Arc<PhotoStorage>,
        default_author_email: String,
    ) -> Self {
        Self {
            store,
            photos,
            default_author_email,
        }
    }

    /// Create a post
    ///
    /// `title` and `content` are expected to be validated by the caller.
    /// Posts created without a logged-in author get the configured default.
    pub async fn create(
        &self,
        title: String,
        content: String,
        author_email: Option<&str>,
    ) -> Result<Post, AppError> {
        let author_email = author_email
            .filter(|email| !email.is_empty())
            .unwrap_or(&self.default_author_email)
            .to_string();

        let post = self
            .store
            .create(NewPost {
                title,
                content,
                author_email,
            })
            .await?;

        POSTS_TOTAL.with_label_values(&["create"]).inc();
        tracing::info!(post_id = post.id, author = %post.author_email, "Post created");
        Ok(post)
    }

    /// All posts, ordered by id
    pub async fn list(&self) -> Result<Vec<Post>, AppError> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, id: i64) -> Result<Post, AppError> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// Apply an edit to a loaded post
    ///
    /// # Arguments
    /// * `content` - Replaces the content when non-empty
    /// * `photo` - Stored and linked through `photo_url`
    ///
    /// A stored photo is removed again if the row cannot be saved; a
    /// replaced photo is removed once it is.
    pub async fn edit(
        &self,
        mut post: Post,
        content: Option<String>,
        photo: Option<PhotoUpload>,
    ) -> Result<Post, AppError> {
        if let Some(content) = content.filter(|content| !content.is_empty()) {
            if content.chars().count() as u64 > MAX_CONTENT_CHARS {
                return Err(AppError::Unprocessable(format!(
                    "content must be at most {} characters",
                    MAX_CONTENT_CHARS
                )));
            }
            post.content = content;
        }

        let previous_photo = post.photo_url.clone();
        let stored_photo = match photo {
            Some(photo) => {
                let url = self.photos.save(post.id, photo).await?;
                post.photo_url = url.clone();
                Some(url)
            }
            None => None,
        };

        match self.store.edit(&post).await {
            Ok(saved) => {
                if stored_photo.is_some() && previous_photo != saved.photo_url {
                    self.discard_photo(&previous_photo).await;
                }
                POSTS_TOTAL.with_label_values(&["edit"]).inc();
                tracing::info!(post_id = saved.id, "Post updated");
                Ok(saved)
            }
            Err(error) => {
                if let Some(url) = stored_photo {
                    self.discard_photo(&url).await;
                }
                Err(error.into())
            }
        }
    }

    /// Delete a post and its photo
    pub async fn delete(&self, post: &Post) -> Result<(), AppError> {
        self.store.delete(post.id).await?;
        self.discard_photo(&post.photo_url).await;
        POSTS_TOTAL.with_label_values(&["delete"]).inc();
        tracing::info!(post_id = post.id, "Post deleted");
        Ok(())
    }

    /// Remove a photo that no row points to any more; failures are logged
    async fn discard_photo(&self, photo_url: &str) {
        if photo_url.is_empty() {
            return;
        }
        if let Err(error) = self.photos.remove(photo_url).await {
            tracing::warn!(photo = %photo_url, %error, "Failed to remove unused photo");
        }
    }
}
