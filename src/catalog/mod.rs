//! Sequence catalog: the immutable store of sequence definitions.
//!
//! Definitions are never mutated in place. Augmenting a sequence (several
//! plugins contributing movements to the same id) keeps every contribution
//! and rebuilds a fresh merged definition, so readers holding an older
//! `Arc<SequenceDefinition>` keep a consistent snapshot.

pub mod parser;
pub mod validation;

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::model::SequenceDefinition;
use crate::error::{OrchestrationError, OrchestrationResult};

pub use parser::{load_manifest_file, parse_manifest, ManifestFormat};
pub use validation::validate_definition;

/// How `register` treats an id that is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterMode {
    /// Fail with `DuplicateSequence`.
    Exclusive,
    /// Merge the new movements into the existing definition.
    Augment,
}

struct Contribution {
    owner: Option<String>,
    definition: SequenceDefinition,
}

struct CatalogEntry {
    contributions: Vec<Contribution>,
    merged: Arc<SequenceDefinition>,
}

impl CatalogEntry {
    fn rebuild(contributions: Vec<Contribution>) -> Option<Self> {
        let mut iter = contributions.iter();
        let mut merged = iter.next()?.definition.clone();
        for contribution in iter {
            merged.augment(contribution.definition.clone());
        }
        merged.normalize();
        Some(Self {
            contributions,
            merged: Arc::new(merged),
        })
    }
}

/// Registered sequence ids at one point in time.
///
/// Iterating is lazy and finite, and the snapshot can be walked again from
/// the start as often as needed.
#[derive(Debug, Clone)]
pub struct SequenceIds {
    ids: Arc<[String]>,
}

impl SequenceIds {
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<'a> IntoIterator for &'a SequenceIds {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

#[derive(Default)]
pub struct SequenceCatalog {
    entries: RwLock<BTreeMap<String, CatalogEntry>>,
}

impl SequenceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, failing if the id is taken.
    pub fn register(&self, definition: SequenceDefinition) -> OrchestrationResult<Vec<String>> {
        self.register_with(definition, RegisterMode::Exclusive, None)
    }

    /// Register a definition on behalf of `owner`. Returns validation warnings.
    pub fn register_with(
        &self,
        mut definition: SequenceDefinition,
        mode: RegisterMode,
        owner: Option<&str>,
    ) -> OrchestrationResult<Vec<String>> {
        definition.normalize();
        let warnings = validate_definition(&definition)?;
        let id = definition.id.clone();
        let contribution = Contribution {
            owner: owner.map(str::to_string),
            definition,
        };

        let mut entries = self.entries.write();
        match entries.remove(&id) {
            Some(existing) if mode == RegisterMode::Exclusive => {
                entries.insert(id.clone(), existing);
                return Err(OrchestrationError::DuplicateSequence(id));
            }
            Some(existing) => {
                let mut contributions = existing.contributions;
                contributions.push(contribution);
                if let Some(entry) = CatalogEntry::rebuild(contributions) {
                    entries.insert(id.clone(), entry);
                }
                tracing::debug!(sequence_id = %id, "sequence augmented");
            }
            None => {
                if let Some(entry) = CatalogEntry::rebuild(vec![contribution]) {
                    entries.insert(id.clone(), entry);
                }
                tracing::debug!(sequence_id = %id, "sequence registered");
            }
        }
        Ok(warnings)
    }

    /// Remove a definition with all its contributions. No-op when absent.
    pub fn unregister(&self, id: &str) -> bool {
        self.entries.write().remove(id).is_some()
    }

    /// Drop every contribution made by `owner`. Returns the ids that changed;
    /// sequences left without contributions are removed.
    pub fn remove_owner(&self, owner: &str) -> Vec<String> {
        let mut entries = self.entries.write();
        let affected: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| {
                entry
                    .contributions
                    .iter()
                    .any(|c| c.owner.as_deref() == Some(owner))
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &affected {
            if let Some(entry) = entries.remove(id) {
                let remaining: Vec<Contribution> = entry
                    .contributions
                    .into_iter()
                    .filter(|c| c.owner.as_deref() != Some(owner))
                    .collect();
                if let Some(rebuilt) = CatalogEntry::rebuild(remaining) {
                    entries.insert(id.clone(), rebuilt);
                }
            }
        }
        affected
    }

    pub fn get(&self, id: &str) -> OrchestrationResult<Arc<SequenceDefinition>> {
        self.entries
            .read()
            .get(id)
            .map(|entry| entry.merged.clone())
            .ok_or_else(|| OrchestrationError::SequenceNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn list_ids(&self) -> SequenceIds {
        let ids: Vec<String> = self.entries.read().keys().cloned().collect();
        SequenceIds { ids: ids.into() }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
