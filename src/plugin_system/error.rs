//! Error types for the plugin system.

use thiserror::Error;

/// Errors that can occur while installing, mounting or unmounting plugins.
#[derive(Error, Debug, Clone)]
pub enum PluginError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Plugin conflict: {0}")]
    ConflictError(String),
    #[error("Plugin not found: {0}")]
    NotFound(String),
    #[error("Register error: {0}")]
    RegisterError(String),
}
