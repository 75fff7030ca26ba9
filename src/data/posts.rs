//! Post queries

use async_trait::async_trait;
use chrono::Utc;

use super::database::Database;
use super::models::{NewPost, Post};
use super::store::{PostStore, StoreError, bounded};

const POST_COLUMNS: &str = "id, title, content, author_email, created_at, photo_url";

#[async_trait]
impl PostStore for Database {
    async fn create(&self, post: NewPost) -> Result<Post, StoreError> {
        let query = format!(
            r#"
            INSERT INTO posts (title, content, author_email, photo_url, created_at)
            VALUES (?, ?, ?, '', ?)
            RETURNING {POST_COLUMNS}
            "#
        );

        let created = bounded("insert", "posts", async {
            let mut tx = self.pool.begin().await?;
            let created = sqlx::query_as::<_, Post>(&query)
                .bind(&post.title)
                .bind(&post.content)
                .bind(&post.author_email)
                .bind(Utc::now())
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(created)
        })
        .await?;

        tracing::debug!(post_id = created.id, "Post inserted");
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Post, StoreError> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?");

        bounded(
            "select",
            "posts",
            sqlx::query_as::<_, Post>(&query)
                .bind(id)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn list(&self) -> Result<Vec<Post>, StoreError> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts ORDER BY id");

        bounded(
            "select",
            "posts",
            sqlx::query_as::<_, Post>(&query).fetch_all(&self.pool),
        )
        .await
    }

    async fn edit(&self, post: &Post) -> Result<Post, StoreError> {
        let query = format!(
            r#"
            UPDATE posts
            SET content = ?, photo_url = ?
            WHERE id = ?
            RETURNING {POST_COLUMNS}
            "#
        );

        bounded("update", "posts", async {
            let mut tx = self.pool.begin().await?;
            let saved = sqlx::query_as::<_, Post>(&query)
                .bind(&post.content)
                .bind(&post.photo_url)
                .bind(post.id)
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(saved)
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = bounded(
            "delete",
            "posts",
            sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
