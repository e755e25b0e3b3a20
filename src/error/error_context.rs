use serde::{Deserialize, Serialize};

/// Error retryability marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorRetryability {
    Retryable,
    NonRetryable,
}

/// Error severity marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// Recorded, run continues
    Warning,
    /// Run aborted
    Error,
}

/// Error classification code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Admission
    SequenceNotFound,
    DuplicateSequence,
    ResourceConflict,
    QueueFull,

    // Run
    BeatExecutionFailed,
    HandlerFailed,
    HandlerNotFound,
    InvalidPayload,
    DependencyNotSatisfied,
    RunCancelled,
    Timeout,

    // Common
    CatalogError,
    PluginError,
    ConfigError,
    SerializationError,
    InternalError,
}

impl ErrorCode {
    /// Whether resubmitting the same request may succeed later.
    pub fn retryability(&self) -> ErrorRetryability {
        match self {
            ErrorCode::ResourceConflict
            | ErrorCode::QueueFull
            | ErrorCode::Timeout
            | ErrorCode::HandlerFailed => ErrorRetryability::Retryable,
            _ => ErrorRetryability::NonRetryable,
        }
    }
}

/// Structured error context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub code: ErrorCode,
    pub retryability: ErrorRetryability,
    pub severity: ErrorSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ErrorContext {
    pub fn new(code: ErrorCode, severity: ErrorSeverity, message: impl Into<String>) -> Self {
        Self {
            code,
            retryability: code.retryability(),
            severity,
            message: message.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
