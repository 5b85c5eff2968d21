use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use models::User;
use tracing::info;

use crate::auth::errors::AuthError;
use crate::auth::repository::UserRepository;
use crate::errors::ServiceError;
use crate::storage::json_map_store::JsonMapStore;

/// User table persisted as a JSON file keyed by email.
///
/// The first open seeds the file with the default accounts; after that the
/// file is the source of truth, so signups survive restarts.
#[derive(Clone)]
pub struct JsonUserRepository {
    store: Arc<JsonMapStore<String, User>>,
}

impl JsonUserRepository {
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, ServiceError> {
        let store = JsonMapStore::open_or_seed(path, || {
            models::seed::users()
                .into_iter()
                .map(|u| (u.email.clone(), u))
                .collect::<HashMap<_, _>>()
        })
        .await?;
        info!(users = store.len().await, "user repository ready");
        Ok(Self { store })
    }
}

#[async_trait]
impl UserRepository for JsonUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.get(&email.to_string()).await)
    }

    async fn create_user(&self, user: User) -> Result<User, AuthError> {
        if !self.store.insert_new(user.email.clone(), user.clone()).await? {
            return Err(AuthError::AlreadyExists);
        }
        Ok(user)
    }
}
