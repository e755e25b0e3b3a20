use async_trait::async_trait;

use super::context::PluginContext;
use super::error::PluginError;

/// Plugin metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
}

impl PluginMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: "0.1.0".to_string(),
            description: String::new(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A bundle of sequences and handlers installed into a [`PluginHost`](super::PluginHost).
#[async_trait]
pub trait Plugin: Send + Sync {
    fn metadata(&self) -> &PluginMetadata;

    /// Contribute sequences and handlers through the context.
    async fn register(&self, context: &mut PluginContext) -> Result<(), PluginError>;

    async fn shutdown(&self) -> Result<(), PluginError> {
        Ok(())
    }
}
