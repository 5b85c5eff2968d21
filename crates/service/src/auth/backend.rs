use async_trait::async_trait;
use tracing::warn;

use super::domain::{AuthSession, LoginInput, SignupInput, SignupOutcome};
use super::errors::AuthError;
use super::repository::UserRepository;
use super::service::AuthService;

/// The auth backend as seen by clients: the three `/api/auth/*` operations.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError>;
    /// Best-effort notification; callers must not depend on its outcome.
    async fn logout(&self, token: Option<&str>) -> Result<(), AuthError>;
    /// Returns the backend's confirmation message.
    async fn signup(&self, input: SignupInput) -> Result<String, AuthError>;
}

pub const SIGNUP_MESSAGE: &str = "Account created successfully. Please login to continue.";

#[async_trait]
impl<R: UserRepository + 'static> AuthBackend for AuthService<R> {
    async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        AuthService::login(self, input).await
    }

    async fn logout(&self, token: Option<&str>) -> Result<(), AuthError> {
        AuthService::logout(self, token).await
    }

    async fn signup(&self, input: SignupInput) -> Result<String, AuthError> {
        AuthService::signup(self, input).await.map(|_| SIGNUP_MESSAGE.to_string())
    }
}

/// Signup flow: run the backend call and report the result as a value.
pub async fn signup(backend: &dyn AuthBackend, input: SignupInput) -> SignupOutcome {
    let email = input.email.clone();
    match backend.signup(input).await {
        Ok(message) => SignupOutcome::success(message),
        Err(e) => {
            warn!(%email, code = e.code(), error = %e, "signup_failed");
            SignupOutcome::failure(e.to_string())
        }
    }
}
