use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use models::user::{validate_email, validate_name, validate_password};
use models::{User, UserRole, UserStatus};
use tracing::{debug, info, instrument};

use super::domain::{AuthSession, LoginInput, SignupInput};
use super::errors::AuthError;
use super::repository::UserRepository;

/// Token handed out on every successful mock login; it carries no meaning.
pub const MOCK_TOKEN: &str = "mock_token";

/// Auth service configuration: simulated network latency per operation.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub login_delay: Duration,
    pub logout_delay: Duration,
    pub signup_delay: Duration,
}

impl AuthConfig {
    /// No simulated latency; for tests and benchmarks.
    pub fn instant() -> Self {
        Self { login_delay: Duration::ZERO, logout_delay: Duration::ZERO, signup_delay: Duration::ZERO }
    }

    pub fn from_mock_config(cfg: &configs::MockConfig) -> Self {
        Self {
            login_delay: Duration::from_millis(cfg.login_delay_ms),
            logout_delay: Duration::from_millis(cfg.logout_delay_ms),
            signup_delay: Duration::from_millis(cfg.signup_delay_ms),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_delay: Duration::from_millis(1000),
            logout_delay: Duration::from_millis(500),
            signup_delay: Duration::from_millis(1500),
        }
    }
}

/// Mock auth backend independent of web framework.
///
/// Credentials are compared as stored; there is no hashing and the token is
/// a fixed placeholder.
pub struct AuthService<R: UserRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    async fn simulate_latency(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Authenticate a user and return their public profile with a token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockUserRepository};
    /// use service::auth::domain::LoginInput;
    /// use std::sync::Arc;
    /// let svc = AuthService::new(Arc::new(MockUserRepository::seeded()), AuthConfig::instant());
    /// let session = tokio_test::block_on(svc.login(LoginInput::new("merchant1@gmail.com", "12345678"))).unwrap();
    /// assert_eq!(session.user.email, "merchant1@gmail.com");
    /// assert_eq!(session.token, "mock_token");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        Self::simulate_latency(self.cfg.login_delay).await;

        let user = self.repo
            .find_by_email(&input.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if user.password != input.password {
            debug!("password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.status.is_active() {
            info!(user_id = %user.id, "login_rejected_inactive");
            return Err(AuthError::AccountInactive);
        }

        info!(user_id = %user.id, role = %user.role, "login_succeeded");
        Ok(AuthSession { user: user.into(), token: MOCK_TOKEN.to_string() })
    }

    #[instrument(skip(self, _token))]
    pub async fn logout(&self, _token: Option<&str>) -> Result<(), AuthError> {
        Self::simulate_latency(self.cfg.logout_delay).await;
        debug!("logout_acknowledged");
        Ok(())
    }

    /// Register a self-service merchant account (role `user`, status `active`).
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockUserRepository};
    /// use service::auth::domain::SignupInput;
    /// use std::sync::Arc;
    /// let svc = AuthService::new(Arc::new(MockUserRepository::seeded()), AuthConfig::instant());
    /// let input = SignupInput {
    ///     email: "new@shop.et".into(), first_name: "Meron".into(), last_name: "Alemu".into(),
    ///     phone: None, city: Some("Addis Ababa".into()), password: "Secret123".into(),
    /// };
    /// let user = tokio_test::block_on(svc.signup(input)).unwrap();
    /// assert_eq!(user.email, "new@shop.et");
    /// assert!(user.id.starts_with("user_"));
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn signup(&self, input: SignupInput) -> Result<User, AuthError> {
        Self::simulate_latency(self.cfg.signup_delay).await;

        validate_email(&input.email)?;
        validate_name(&input.first_name)?;
        validate_name(&input.last_name)?;
        validate_password(&input.password)?;

        if self.repo.find_by_email(&input.email).await?.is_some() {
            debug!("user exists");
            return Err(AuthError::AlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            id: format!("user_{}", now.timestamp_millis()),
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
            phone: input.phone,
            city: input.city,
            role: UserRole::User,
            status: UserStatus::Active,
            created_at: now,
            password: input.password,
        };
        let user = self.repo.create_user(user).await?;
        info!(user_id = %user.id, "user_registered");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockUserRepository;

    fn svc() -> AuthService<MockUserRepository> {
        AuthService::new(Arc::new(MockUserRepository::seeded()), AuthConfig::instant())
    }

    #[tokio::test]
    async fn login_strips_password() -> anyhow::Result<()> {
        let session = svc().login(LoginInput::new("merchant1@gmail.com", "12345678")).await?;
        assert_eq!(session.user.role, UserRole::User);
        let json = serde_json::to_value(&session)?;
        assert!(json["user"].get("password").is_none());
        assert_eq!(json["token"], MOCK_TOKEN);
        Ok(())
    }

    #[tokio::test]
    async fn login_failures() {
        let svc = svc();
        let wrong = svc.login(LoginInput::new("merchant1@gmail.com", "nope")).await;
        assert_eq!(wrong.unwrap_err(), AuthError::InvalidCredentials);
        let unknown = svc.login(LoginInput::new("ghost@gmail.com", "12345678")).await;
        assert_eq!(unknown.unwrap_err(), AuthError::InvalidCredentials);
        let inactive = svc.login(LoginInput::new("merchant3@gmail.com", "12345678")).await;
        assert_eq!(inactive.unwrap_err(), AuthError::AccountInactive);
    }

    #[tokio::test]
    async fn signup_conflict_and_validation() {
        let svc = svc();
        let mut input = SignupInput {
            email: "merchant1@gmail.com".into(),
            first_name: "Dup".into(),
            last_name: "User".into(),
            phone: None,
            city: None,
            password: "12345678".into(),
        };
        assert_eq!(svc.signup(input.clone()).await.unwrap_err(), AuthError::AlreadyExists);

        input.email = "fresh@gmail.com".into();
        input.password = "short".into();
        assert!(matches!(svc.signup(input.clone()).await, Err(AuthError::Validation(_))));

        input.password = "longenough".into();
        let created = svc.signup(input).await.expect("signup");
        let session = svc.login(LoginInput::new("fresh@gmail.com", "longenough")).await.expect("login");
        assert_eq!(session.user.id, created.id);
    }

    #[tokio::test(start_paused = true)]
    async fn login_waits_for_simulated_latency() {
        let svc = AuthService::new(Arc::new(MockUserRepository::seeded()), AuthConfig::default());
        let started = tokio::time::Instant::now();
        svc.login(LoginInput::new("merchant2@gmail.com", "12345678")).await.expect("login");
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }
}
