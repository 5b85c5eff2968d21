#![cfg(test)]
//! Backends and storages with scripted failure modes for session tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::auth::backend::AuthBackend;
use crate::auth::domain::{AuthSession, LoginInput, SignupInput};
use crate::auth::errors::AuthError;
use crate::auth::repository::mock::MockUserRepository;
use crate::auth::service::{AuthConfig, AuthService};
use crate::errors::ServiceError;
use crate::storage::DurableStorage;

pub fn mock_service() -> AuthService<MockUserRepository> {
    AuthService::new(Arc::new(MockUserRepository::seeded()), AuthConfig::instant())
}

/// Seeded mock backend with knobs for the failure modes the store must survive.
pub struct ScriptedBackend {
    inner: AuthService<MockUserRepository>,
    gate: Option<Arc<Notify>>,
    hang: bool,
    fail_logout: bool,
    pub logins: AtomicUsize,
    pub logouts: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self { inner: mock_service(), gate: None, hang: false, fail_logout: false, logins: AtomicUsize::new(0), logouts: AtomicUsize::new(0) }
    }

    /// Logins wait until the returned `Notify` is signalled.
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (Self { gate: Some(Arc::clone(&gate)), ..Self::new() }, gate)
    }

    /// Logins never complete.
    pub fn hanging() -> Self {
        Self { hang: true, ..Self::new() }
    }

    /// Logout notifications always fail.
    pub fn failing_logout() -> Self {
        Self { fail_logout: true, ..Self::new() }
    }
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.inner.login(input).await
    }

    async fn logout(&self, token: Option<&str>) -> Result<(), AuthError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        if self.fail_logout {
            return Err(AuthError::transport("connection reset by peer"));
        }
        self.inner.logout(token).await
    }

    async fn signup(&self, input: SignupInput) -> Result<String, AuthError> {
        AuthBackend::signup(&self.inner, input).await
    }
}

/// Storage whose writes always fail; reads see nothing.
pub struct ReadOnlyStorage;

impl DurableStorage for ReadOnlyStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, ServiceError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), ServiceError> {
        Err(ServiceError::Storage("quota exceeded".into()))
    }

    fn remove(&self, _key: &str) -> Result<(), ServiceError> {
        Err(ServiceError::Storage("quota exceeded".into()))
    }
}
