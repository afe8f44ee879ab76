use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;
use thiserror::Error;

/// Failure reported by a store backend (DynamoDB or in-memory).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Error taxonomy shared by every task and user operation.
#[derive(Debug, Error)]
pub enum WorkNestError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Internal(String),
}

impl WorkNestError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn task_not_found() -> Self {
        Self::NotFound("Task not found".to_string())
    }

    pub fn user_not_found() -> Self {
        Self::NotFound("User not found".to_string())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render as the `{ message, error? }` envelope clients expect.
    pub fn into_response(self) -> Result<Response<Body>, Error> {
        let status = self.status_code();
        let body = match self {
            Self::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorBody {
                    message: "Server error".to_string(),
                    error: Some(detail),
                }
            }
            Self::Validation(message)
            | Self::NotFound(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message) => {
                ErrorBody {
                    message,
                    error: None,
                }
            }
        };
        crate::response::json(status, &body)
    }
}

impl From<StoreError> for WorkNestError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.0)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
