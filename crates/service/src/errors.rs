use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn storage(err: impl std::fmt::Display) -> Self { Self::Storage(err.to_string()) }
}
