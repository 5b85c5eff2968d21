use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ApiResponse;
use service::auth::AuthError;
use thiserror::Error;
use tracing::error;

/// Error returned by API handlers; rendered as the `{success:false, data:null, message}` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::AccountInactive) => StatusCode::FORBIDDEN,
            ApiError::Auth(AuthError::AlreadyExists) => StatusCode::CONFLICT,
            ApiError::Auth(AuthError::Validation(_)) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(ApiResponse::<()>::failure(self.to_string()))).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("storage unavailable: {0}")]
    Storage(#[from] service::errors::ServiceError),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
