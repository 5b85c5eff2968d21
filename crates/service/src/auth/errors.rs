use thiserror::Error;

/// Business errors for auth workflows
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account is inactive")]
    AccountInactive,
    #[error("{0}")]
    Transport(String),
    #[error("User with this email already exists")]
    AlreadyExists,
    #[error("{0}")]
    Validation(String),
    /// Any other refusal from the backend, carrying its message verbatim.
    #[error("{0}")]
    Rejected(String),
    #[error("Login already in progress")]
    LoginInFlight,
    #[error("Session is not ready yet")]
    NotHydrated,
    #[error("Login cancelled by logout")]
    Superseded,
    #[error("repository error: {0}")]
    Repository(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::AlreadyExists => 1002,
            AuthError::InvalidCredentials => 1004,
            AuthError::AccountInactive => 1005,
            AuthError::Rejected(_) => 1006,
            AuthError::LoginInFlight => 1010,
            AuthError::NotHydrated => 1011,
            AuthError::Superseded => 1012,
            AuthError::Transport(_) => 1100,
            AuthError::Repository(_) => 1200,
        }
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        AuthError::Transport(err.to_string())
    }
}

impl From<models::errors::ModelError> for AuthError {
    fn from(err: models::errors::ModelError) -> Self {
        match err {
            models::errors::ModelError::Validation(msg) => AuthError::Validation(msg),
        }
    }
}

impl From<crate::errors::ServiceError> for AuthError {
    fn from(err: crate::errors::ServiceError) -> Self {
        AuthError::Repository(err.to_string())
    }
}
