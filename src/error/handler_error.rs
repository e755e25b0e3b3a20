use thiserror::Error;

use super::error_context::ErrorCode;

/// Beat handler errors
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("No handler registered for '{handler}' in sequence '{sequence_id}'")]
    HandlerNotFound {
        sequence_id: String,
        handler: String,
    },
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Dependency not satisfied: {0}")]
    DependencyNotSatisfied(String),
    #[error("Cancelled while waiting")]
    Cancelled,
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            HandlerError::Failed(_) => ErrorCode::HandlerFailed,
            HandlerError::InvalidPayload(_) => ErrorCode::InvalidPayload,
            HandlerError::HandlerNotFound { .. } => ErrorCode::HandlerNotFound,
            HandlerError::Serialization(_) => ErrorCode::SerializationError,
            HandlerError::DependencyNotSatisfied(_) => ErrorCode::DependencyNotSatisfied,
            HandlerError::Cancelled => ErrorCode::RunCancelled,
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::Serialization(e.to_string())
    }
}
