use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::context::{HandlerMap, PluginContext};
use super::error::PluginError;
use super::traits::{Plugin, PluginMetadata};
use crate::catalog::{RegisterMode, SequenceCatalog};
use crate::dispatch::HandlerRegistry;
use crate::domain::model::SequenceDefinition;

/// Outcome of mounting one sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountResult {
    pub success: bool,
    pub plugin_id: String,
    pub sequence_id: String,
    pub warnings: Vec<String>,
}

#[derive(Default)]
struct InstalledPlugin {
    plugin: Option<Arc<dyn Plugin>>,
    metadata: Option<PluginMetadata>,
    sequences: Vec<String>,
}

/// Mounts plugin contributions into a shared catalog and handler registry.
pub struct PluginHost {
    catalog: Arc<SequenceCatalog>,
    handlers: Arc<HandlerRegistry>,
    plugins: RwLock<HashMap<String, InstalledPlugin>>,
}

impl PluginHost {
    pub fn new(catalog: Arc<SequenceCatalog>, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            catalog,
            handlers,
            plugins: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &Arc<SequenceCatalog> {
        &self.catalog
    }

    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    /// Mount a sequence and its handlers on behalf of `plugin_id`.
    ///
    /// An existing sequence with the same id is augmented rather than
    /// rejected; handler maps from different plugins are merged.
    pub fn mount(
        &self,
        definition: SequenceDefinition,
        handlers: HandlerMap,
        plugin_id: &str,
    ) -> MountResult {
        let sequence_id = definition.id.clone();
        let mut warnings =
            match self
                .catalog
                .register_with(definition, RegisterMode::Augment, Some(plugin_id))
            {
                Ok(warnings) => warnings,
                Err(e) => {
                    tracing::warn!(
                        plugin_id = %plugin_id,
                        sequence_id = %sequence_id,
                        error = %e,
                        "mount rejected"
                    );
                    return MountResult {
                        success: false,
                        plugin_id: plugin_id.to_string(),
                        sequence_id,
                        warnings: vec![e.to_string()],
                    };
                }
            };

        for (name, handler) in handlers {
            self.handlers.register(&sequence_id, &name, plugin_id, handler);
        }
        warnings.extend(self.unhandled_beats(&sequence_id));

        let mut plugins = self.plugins.write();
        let record = plugins.entry(plugin_id.to_string()).or_default();
        if !record.sequences.contains(&sequence_id) {
            record.sequences.push(sequence_id.clone());
        }
        drop(plugins);

        tracing::info!(
            plugin_id = %plugin_id,
            sequence_id = %sequence_id,
            warnings = warnings.len(),
            "sequence mounted"
        );
        MountResult {
            success: true,
            plugin_id: plugin_id.to_string(),
            sequence_id,
            warnings,
        }
    }

    /// Remove everything `plugin_id` contributed: its handlers, and its
    /// movements from every sequence it mounted. Sequences left empty are
    /// unregistered. Returns whether the plugin had contributed anything.
    pub fn unmount(&self, plugin_id: &str) -> bool {
        let record = self.plugins.write().remove(plugin_id);
        let sequences = self.catalog.remove_owner(plugin_id);
        let handlers = self.handlers.remove_plugin(plugin_id);
        let found = record.is_some() || !sequences.is_empty() || handlers > 0;
        if found {
            tracing::info!(
                plugin_id = %plugin_id,
                sequences = sequences.len(),
                handlers,
                "plugin unmounted"
            );
        }
        found
    }

    /// Run a plugin's registration and mount what it contributed. A failed
    /// mount rolls the whole plugin back.
    pub async fn install(&self, plugin: Box<dyn Plugin>) -> Result<Vec<MountResult>, PluginError> {
        let metadata = plugin.metadata().clone();
        if self.is_installed(&metadata.id) {
            return Err(PluginError::ConflictError(format!(
                "Plugin '{}' already installed",
                metadata.id
            )));
        }

        let mut context = PluginContext::new(metadata.id.clone());
        plugin.register(&mut context).await?;
        let PluginContext {
            sequences,
            mut handlers,
            ..
        } = context;

        let mut results = Vec::with_capacity(sequences.len());
        for definition in sequences {
            let handler_map = handlers.remove(&definition.id).unwrap_or_default();
            let result = self.mount(definition, handler_map, &metadata.id);
            if !result.success {
                self.unmount(&metadata.id);
                return Err(PluginError::RegisterError(result.warnings.join("; ")));
            }
            results.push(result);
        }
        // Handlers for sequences owned by someone else.
        for (sequence_id, handler_map) in handlers {
            for (name, handler) in handler_map {
                self.handlers.register(&sequence_id, &name, &metadata.id, handler);
            }
        }

        let mut plugins = self.plugins.write();
        let record = plugins.entry(metadata.id.clone()).or_default();
        record.plugin = Some(Arc::from(plugin));
        record.metadata = Some(metadata);
        Ok(results)
    }

    /// Shut an installed plugin down, then unmount it.
    pub async fn uninstall(&self, plugin_id: &str) -> Result<(), PluginError> {
        let plugin = self
            .plugins
            .read()
            .get(plugin_id)
            .and_then(|record| record.plugin.clone())
            .ok_or_else(|| PluginError::NotFound(plugin_id.to_string()))?;
        plugin.shutdown().await?;
        self.unmount(plugin_id);
        Ok(())
    }

    pub async fn shutdown_all(&self) -> Result<(), PluginError> {
        let plugins: Vec<Arc<dyn Plugin>> = self
            .plugins
            .read()
            .values()
            .filter_map(|record| record.plugin.clone())
            .collect();
        for plugin in plugins {
            plugin.shutdown().await?;
        }
        Ok(())
    }

    pub fn is_installed(&self, plugin_id: &str) -> bool {
        self.plugins
            .read()
            .get(plugin_id)
            .is_some_and(|record| record.plugin.is_some())
    }

    pub fn plugin_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.plugins.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn plugin_metadata(&self) -> Vec<PluginMetadata> {
        self.plugins
            .read()
            .values()
            .filter_map(|record| record.metadata.clone())
            .collect()
    }

    /// Sequences mounted by `plugin_id`.
    pub fn sequences_of(&self, plugin_id: &str) -> Vec<String> {
        self.plugins
            .read()
            .get(plugin_id)
            .map(|record| record.sequences.clone())
            .unwrap_or_default()
    }

    fn unhandled_beats(&self, sequence_id: &str) -> Vec<String> {
        let Ok(definition) = self.catalog.get(sequence_id) else {
            return Vec::new();
        };
        definition
            .movements
            .iter()
            .flat_map(|movement| movement.beats.iter())
            .filter(|beat| !self.handlers.contains(sequence_id, beat.handler_key()))
            .map(|beat| {
                format!(
                    "no handler registered yet for '{}' (step {})",
                    beat.handler_key(),
                    beat.step_number
                )
            })
            .collect()
    }
}
