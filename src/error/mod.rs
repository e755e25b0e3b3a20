//! Error types for the orchestration core.
//!
//! - [`HandlerError`]: errors raised by an individual beat handler.
//! - [`OrchestrationError`]: top-level errors for catalog, admission and runs.
//! - [`ErrorContext`]: structured error metadata (code, retryability, severity).

pub mod error_context;
pub mod handler_error;
pub mod orchestration_error;

pub use error_context::{ErrorCode, ErrorContext, ErrorRetryability, ErrorSeverity};
pub use handler_error::HandlerError;
pub use orchestration_error::{CatalogError, ConfigError, OrchestrationError};

/// Convenience alias for orchestration-level results.
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;
/// Convenience alias for handler-level results.
pub type HandlerResult<T> = Result<T, HandlerError>;
