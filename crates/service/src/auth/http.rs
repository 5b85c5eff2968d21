use async_trait::async_trait;
use common::types::ApiResponse;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use super::backend::AuthBackend;
use super::domain::{AuthSession, LoginInput, SignupInput};
use super::errors::AuthError;

/// Auth backend reached over HTTP (`{base_url}/api/auth/*`).
///
/// One request per call, no retries and no timeout beyond the client's own.
#[derive(Clone)]
pub struct HttpAuthBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: Option<&B>, token: Option<&str>) -> Result<(StatusCode, ApiResponse<T>), AuthError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = self.client.post(self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.map_err(AuthError::transport)?;
        let status = resp.status();
        let envelope = resp.json::<ApiResponse<T>>().await.map_err(AuthError::transport)?;
        debug!(%path, %status, success = envelope.success, "auth api responded");
        Ok((status, envelope))
    }
}

/// Map a refused response to the error taxonomy by status code.
fn refusal(status: StatusCode, message: String) -> AuthError {
    match status {
        StatusCode::UNAUTHORIZED => AuthError::InvalidCredentials,
        StatusCode::FORBIDDEN => AuthError::AccountInactive,
        StatusCode::CONFLICT => AuthError::AlreadyExists,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AuthError::Validation(message),
        _ if message.is_empty() => AuthError::Rejected(format!("request failed with status {status}")),
        _ => AuthError::Rejected(message),
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let (status, envelope) = self.post::<_, AuthSession>("/api/auth/login", Some(&input), None).await?;
        if !status.is_success() || !envelope.success {
            return Err(refusal(status, envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| AuthError::Transport("login response carried no session".into()))
    }

    #[instrument(skip(self, token))]
    async fn logout(&self, token: Option<&str>) -> Result<(), AuthError> {
        let (status, envelope) = self.post::<(), serde_json::Value>("/api/auth/logout", None, token).await?;
        if !status.is_success() || !envelope.success {
            return Err(refusal(status, envelope.message));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn signup(&self, input: SignupInput) -> Result<String, AuthError> {
        let (status, envelope) = self.post::<_, serde_json::Value>("/api/auth/signup", Some(&input), None).await?;
        if !status.is_success() || !envelope.success {
            return Err(refusal(status, envelope.message));
        }
        Ok(envelope.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusal_mapping() {
        assert_eq!(refusal(StatusCode::UNAUTHORIZED, "x".into()), AuthError::InvalidCredentials);
        assert_eq!(refusal(StatusCode::FORBIDDEN, "x".into()), AuthError::AccountInactive);
        assert_eq!(refusal(StatusCode::CONFLICT, "x".into()), AuthError::AlreadyExists);
        assert_eq!(refusal(StatusCode::BAD_REQUEST, "invalid email".into()), AuthError::Validation("invalid email".into()));
        assert_eq!(
            refusal(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            AuthError::Rejected("request failed with status 500 Internal Server Error".into())
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        // port 9 (discard) on localhost is closed in test environments
        let backend = HttpAuthBackend::new("http://127.0.0.1:9/");
        let err = backend.login(LoginInput::new("merchant1@gmail.com", "12345678")).await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
    }
}
