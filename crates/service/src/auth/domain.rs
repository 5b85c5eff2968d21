use std::fmt;

use models::PublicUser;
use serde::{Deserialize, Serialize};

/// Login input (`POST /api/auth/login` body)
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

impl fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginInput").field("email", &self.email).finish_non_exhaustive()
    }
}

/// Signup input (`POST /api/auth/signup` body)
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub password: String,
}

impl fmt::Debug for SignupInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupInput")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// Login result (session)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: PublicUser,
    pub token: String,
}

/// Outcome reported to callers of login and signup flows; failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

pub type LoginOutcome = ActionOutcome;
pub type SignupOutcome = ActionOutcome;
