use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Response envelope shared by every mock API endpoint: `{success, data, message}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self { success: true, data: Some(data), message: message.into() }
    }

    /// Success without a payload (`data: null` on the wire).
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self { success: true, data: None, message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, data: None, message: message.into() }
    }
}
