use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use common::types::ApiResponse;
use service::auth::domain::{AuthSession, LoginInput, SignupInput};
use service::auth::{AuthBackend, AuthError};
use tracing::info;

use crate::errors::ApiError;
use crate::observability::{LOGIN_ATTEMPTS_TOTAL, LOGOUTS_TOTAL, SIGNUPS_TOTAL};

#[derive(Clone)]
pub struct ServerState {
    pub backend: Arc<dyn AuthBackend>,
}

impl ServerState {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self { backend }
    }
}

fn outcome_label(result: &Result<impl Sized, AuthError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AuthError::InvalidCredentials) => "invalid_credentials",
        Err(AuthError::AccountInactive) => "inactive",
        Err(AuthError::AlreadyExists) => "conflict",
        Err(AuthError::Validation(_)) => "invalid_input",
        Err(_) => "error",
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<ServerState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthSession>>, ApiError> {
    let Json(input) = payload?;
    let result = state.backend.login(input).await;
    LOGIN_ATTEMPTS_TOTAL.with_label_values(&[outcome_label(&result)]).inc();
    let session = result?;
    Ok(Json(ApiResponse::ok(session, "Login successful")))
}

/// `POST /api/auth/logout`; no authorization required.
pub async fn logout(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let token = bearer_token(&headers);
    state.backend.logout(token).await?;
    LOGOUTS_TOTAL.inc();
    info!(with_token = token.is_some(), "logout");
    Ok(Json(ApiResponse::ok_empty("Logout successful")))
}

/// `POST /api/auth/signup`
pub async fn signup(
    State(state): State<ServerState>,
    payload: Result<Json<SignupInput>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Json(input) = payload?;
    let result = state.backend.signup(input).await;
    SIGNUPS_TOTAL.with_label_values(&[outcome_label(&result)]).inc();
    let message = result?;
    Ok(Json(ApiResponse::ok_empty(message)))
}
