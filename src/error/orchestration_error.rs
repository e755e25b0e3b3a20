//! Orchestration-level error types.

use super::error_context::ErrorCode;
use super::HandlerError;
use crate::plugin_system::PluginError;
use thiserror::Error;

/// Errors raised while parsing or validating sequence manifests.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Manifest parse error: {0}")]
    Parse(String),
    #[error("Unsupported manifest format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid sequence '{sequence_id}': {message}")]
    Invalid {
        sequence_id: String,
        message: String,
    },
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors raised while loading orchestrator configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(String),
}

/// Orchestration errors
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Sequence not found: {0}")]
    SequenceNotFound(String),
    #[error("Sequence already registered: {0}")]
    DuplicateSequence(String),
    #[error("Resource conflict on '{resource_id}' (owned by {owner})")]
    ResourceConflictRejected { resource_id: String, owner: String },
    #[error("Beat execution failed: event={event}, step={step}, error={message}")]
    BeatExecutionFailed {
        event: String,
        step: u32,
        message: String,
    },
    #[error("Run cancelled: {request_id}")]
    RunCancelled { request_id: String },
    #[error("Run timed out after {timeout_ms}ms")]
    RunTimedOut { timeout_ms: u64 },
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl OrchestrationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OrchestrationError::SequenceNotFound(_) => ErrorCode::SequenceNotFound,
            OrchestrationError::DuplicateSequence(_) => ErrorCode::DuplicateSequence,
            OrchestrationError::ResourceConflictRejected { .. } => ErrorCode::ResourceConflict,
            OrchestrationError::BeatExecutionFailed { .. } => ErrorCode::BeatExecutionFailed,
            OrchestrationError::RunCancelled { .. } => ErrorCode::RunCancelled,
            OrchestrationError::RunTimedOut { .. } => ErrorCode::Timeout,
            OrchestrationError::Catalog(_) => ErrorCode::CatalogError,
            OrchestrationError::Plugin(_) => ErrorCode::PluginError,
            OrchestrationError::Config(_) => ErrorCode::ConfigError,
            OrchestrationError::Handler(err) => err.code(),
            OrchestrationError::InternalError(_) => ErrorCode::InternalError,
        }
    }
}
