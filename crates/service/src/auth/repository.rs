use async_trait::async_trait;
use models::User;

use super::errors::AuthError;

/// Repository abstraction for the backend's user table.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;
    /// Insert a new user; `AuthError::AlreadyExists` when the email is taken.
    async fn create_user(&self, user: User) -> Result<User, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockUserRepository {
        users: Mutex<HashMap<String, User>>, // key: email
    }

    impl MockUserRepository {
        /// Repository pre-filled with the seeded accounts.
        pub fn seeded() -> Self {
            let users = models::seed::users().into_iter().map(|u| (u.email.clone(), u)).collect();
            Self { users: Mutex::new(users) }
        }

        fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, User>>, AuthError> {
            self.users.lock().map_err(|_| AuthError::Repository("user table lock poisoned".into()))
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
            Ok(self.lock()?.get(email).cloned())
        }

        async fn create_user(&self, user: User) -> Result<User, AuthError> {
            let mut users = self.lock()?;
            if users.contains_key(&user.email) {
                return Err(AuthError::AlreadyExists);
            }
            users.insert(user.email.clone(), user.clone());
            Ok(user)
        }
    }
}
