use dashmap::DashMap;
use std::sync::Arc;

use super::handler::BeatHandler;

#[derive(Clone)]
struct RegisteredHandler {
    plugin_id: String,
    handler: Arc<dyn BeatHandler>,
}

/// Handlers keyed by `(sequence id, handler name)`.
///
/// Several plugins may register under the same key; they are kept in
/// registration order and all of them run for a beat.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<(String, String), Vec<RegisteredHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler on behalf of `plugin_id`. A plugin registering the
    /// same key twice replaces its earlier handler.
    pub fn register(
        &self,
        sequence_id: &str,
        handler_name: &str,
        plugin_id: &str,
        handler: Arc<dyn BeatHandler>,
    ) {
        let mut entry = self
            .handlers
            .entry((sequence_id.to_string(), handler_name.to_string()))
            .or_default();
        match entry.iter_mut().find(|h| h.plugin_id == plugin_id) {
            Some(existing) => existing.handler = handler,
            None => entry.push(RegisteredHandler {
                plugin_id: plugin_id.to_string(),
                handler,
            }),
        }
    }

    /// Handlers for a key, in registration order.
    pub fn handlers(&self, sequence_id: &str, handler_name: &str) -> Vec<Arc<dyn BeatHandler>> {
        self.handlers
            .get(&(sequence_id.to_string(), handler_name.to_string()))
            .map(|entry| entry.iter().map(|h| h.handler.clone()).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, sequence_id: &str, handler_name: &str) -> bool {
        self.handlers
            .get(&(sequence_id.to_string(), handler_name.to_string()))
            .is_some_and(|entry| !entry.is_empty())
    }

    /// Drop everything `plugin_id` registered. Returns how many handlers went.
    pub fn remove_plugin(&self, plugin_id: &str) -> usize {
        let mut removed = 0;
        self.handlers.retain(|_, entry| {
            let before = entry.len();
            entry.retain(|h| h.plugin_id != plugin_id);
            removed += before - entry.len();
            !entry.is_empty()
        });
        removed
    }

    pub fn remove_sequence(&self, sequence_id: &str) {
        self.handlers.retain(|(seq, _), _| seq != sequence_id);
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
