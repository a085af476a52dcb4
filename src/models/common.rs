use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Envelope shared by every response: `{success, code, data}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: u16,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Debug form of the underlying error, development mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiBody {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
            details: None,
        }
    }

    pub fn error(message: impl Into<String>, error: ErrorKind) -> Self {
        Self {
            message: message.into(),
            error: Some(error),
            details: None,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(code: u16, data: T) -> Self {
        Self {
            success: true,
            code,
            data,
        }
    }

    pub fn failure(code: u16, data: T) -> Self {
        Self {
            success: false,
            code,
            data,
        }
    }
}
