//! Account service
//!
//! Local user accounts created from OAuth logins.

use std::sync::Arc;

use crate::auth::ProviderUser;
use crate::data::{User, UserStore};
use crate::error::AppError;

/// Account service
pub struct AccountService {
    store: Arc<dyn UserStore>,
}

impl AccountService {
    /// Create new account service
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Record a local account for a freshly authenticated user
    ///
    /// # Errors
    /// [`AppError::DuplicateUser`] when the email already has an account;
    /// no row is written in that case
    pub async fn register(&self, user: &ProviderUser) -> Result<User, AppError> {
        let email = user.email.trim();
        if email.is_empty() {
            return Err(AppError::Auth("provider returned no email".to_string()));
        }

        let username = user.preferred_username();
        Ok(self.store.create_user(&username, email).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User, AppError> {
        Ok(self.store.get_user_by_email(email).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MockUserStore, StoreError};
    use chrono::Utc;

    fn profile(first_name: &str, email: &str) -> ProviderUser {
        ProviderUser {
            provider: "google".to_string(),
            user_id: "42".to_string(),
            email: email.to_string(),
            name: "Ada Lovelace".to_string(),
            first_name: first_name.to_string(),
            last_name: "Lovelace".to_string(),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn register_stores_first_name_and_email() {
        let mut store = MockUserStore::new();
        store
            .expect_create_user()
            .withf(|username, email| username == "Ada" && email == "ada@example.com")
            .times(1)
            .returning(|username, email| {
                Ok(User {
                    id: 1,
                    username: username.to_string(),
                    email: email.to_string(),
                    created_at: Utc::now(),
                })
            });
        let service = AccountService::new(Arc::new(store));

        let user = service
            .register(&profile("Ada", "ada@example.com"))
            .await
            .unwrap();
        assert_eq!(user.username, "Ada");
    }

    #[tokio::test]
    async fn register_existing_email_is_duplicate() {
        let mut store = MockUserStore::new();
        store
            .expect_create_user()
            .returning(|_, _| Err(StoreError::DuplicateUser));
        let service = AccountService::new(Arc::new(store));

        assert!(matches!(
            service.register(&profile("Ada", "ada@example.com")).await,
            Err(AppError::DuplicateUser)
        ));
    }

    #[tokio::test]
    async fn register_without_email_never_hits_the_store() {
        let mut store = MockUserStore::new();
        store.expect_create_user().never();
        let service = AccountService::new(Arc::new(store));

        assert!(matches!(
            service.register(&profile("Ada", "  ")).await,
            Err(AppError::Auth(_))
        ));
    }
}
