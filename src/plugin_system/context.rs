//! Plugin context provided to plugins during registration.

use std::collections::HashMap;
use std::sync::Arc;

use super::error::PluginError;
use crate::dispatch::BeatHandler;
use crate::domain::model::SequenceDefinition;

/// Handler name to handler, for one sequence.
pub type HandlerMap = HashMap<String, Arc<dyn BeatHandler>>;

/// Mutable context passed to [`Plugin::register()`](super::Plugin::register).
///
/// Collects what the plugin contributes; nothing reaches the catalog until
/// registration returns successfully.
pub struct PluginContext {
    plugin_id: String,
    pub(crate) sequences: Vec<SequenceDefinition>,
    pub(crate) handlers: HashMap<String, HandlerMap>,
}

impl PluginContext {
    pub(crate) fn new(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            sequences: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Return the id of the plugin currently being registered.
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Emit a structured log line tagged with the plugin id.
    pub fn log(&self, level: tracing::Level, message: &str) {
        match level {
            tracing::Level::TRACE => tracing::trace!(plugin_id = %self.plugin_id, message = %message),
            tracing::Level::DEBUG => tracing::debug!(plugin_id = %self.plugin_id, message = %message),
            tracing::Level::INFO => tracing::info!(plugin_id = %self.plugin_id, message = %message),
            tracing::Level::WARN => tracing::warn!(plugin_id = %self.plugin_id, message = %message),
            tracing::Level::ERROR => tracing::error!(plugin_id = %self.plugin_id, message = %message),
        }
    }

    /// Contribute a sequence. Contributing the same id twice from one plugin
    /// merges the movements.
    pub fn register_sequence(&mut self, definition: SequenceDefinition) -> Result<(), PluginError> {
        if definition.id.trim().is_empty() {
            return Err(PluginError::InvalidConfig(
                "sequence id must not be empty".into(),
            ));
        }
        match self.sequences.iter_mut().find(|s| s.id == definition.id) {
            Some(existing) => existing.augment(definition),
            None => self.sequences.push(definition),
        }
        Ok(())
    }

    /// Register a handler for a beat of `sequence_id`, which may belong to
    /// another plugin.
    pub fn register_handler(
        &mut self,
        sequence_id: &str,
        handler_name: &str,
        handler: Arc<dyn BeatHandler>,
    ) -> Result<(), PluginError> {
        if handler_name.trim().is_empty() {
            return Err(PluginError::InvalidConfig(format!(
                "empty handler name for sequence '{}'",
                sequence_id
            )));
        }
        let handlers = self.handlers.entry(sequence_id.to_string()).or_default();
        if handlers.contains_key(handler_name) {
            return Err(PluginError::ConflictError(format!(
                "Handler '{}' already registered for sequence '{}'",
                handler_name, sequence_id
            )));
        }
        handlers.insert(handler_name.to_string(), handler);
        Ok(())
    }

    pub fn sequence_ids(&self) -> Vec<&str> {
        self.sequences.iter().map(|s| s.id.as_str()).collect()
    }
}
