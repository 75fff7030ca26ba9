//! User queries

use async_trait::async_trait;
use chrono::Utc;

use super::database::Database;
use super::models::User;
use super::store::{StoreError, UserStore, bounded};

#[async_trait]
impl UserStore for Database {
    async fn create_user(&self, username: &str, email: &str) -> Result<User, StoreError> {
        let result = bounded("insert", "users", async {
            let mut tx = self.pool.begin().await?;
            let user = sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (username, email, created_at)
                VALUES (?, ?, ?)
                RETURNING id, username, email, created_at
                "#,
            )
            .bind(username)
            .bind(email)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(user)
        })
        .await;

        match result {
            Err(err) if err.is_unique_violation() => Err(StoreError::DuplicateUser),
            other => other,
        }
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, StoreError> {
        bounded(
            "select",
            "users",
            sqlx::query_as::<_, User>(
                "SELECT id, username, email, created_at FROM users WHERE id = ?",
            )
            .bind(id)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        bounded(
            "select",
            "users",
            sqlx::query_as::<_, User>(
                "SELECT id, username, email, created_at FROM users WHERE email = ?",
            )
            .bind(email)
            .fetch_one(&self.pool),
        )
        .await
    }
}
