//! Structural checks applied before a definition enters the catalog.

use std::collections::HashSet;

use crate::domain::model::{SequenceDefinition, TimingMode};
use crate::error::CatalogError;

/// Validate a normalized definition. Hard errors reject it; the returned
/// strings are warnings worth surfacing to whoever mounted it.
pub fn validate_definition(def: &SequenceDefinition) -> Result<Vec<String>, CatalogError> {
    let invalid = |message: String| CatalogError::Invalid {
        sequence_id: def.id.clone(),
        message,
    };

    if def.id.trim().is_empty() {
        return Err(invalid("sequence id must not be empty".to_string()));
    }

    let mut warnings = Vec::new();
    if def.movements.is_empty() {
        warnings.push(format!("sequence '{}' has no movements", def.id));
    }

    let mut seen_events: HashSet<&str> = HashSet::new();
    for (index, movement) in def.movements.iter().enumerate() {
        if movement.beats.is_empty() {
            warnings.push(format!(
                "movement #{} ('{}') has no beats",
                index, movement.name
            ));
        }
        let mut steps = HashSet::new();
        for beat in &movement.beats {
            if beat.event_name.trim().is_empty() {
                return Err(invalid(format!(
                    "beat {} in movement '{}' has an empty event name",
                    beat.step_number, movement.name
                )));
            }
            if !steps.insert(beat.step_number) {
                return Err(invalid(format!(
                    "duplicate step number {} in movement '{}'",
                    beat.step_number, movement.name
                )));
            }
            match &beat.timing {
                TimingMode::AfterDependency { dependency } => {
                    if !seen_events.contains(dependency.as_str()) {
                        warnings.push(format!(
                            "beat '{}' depends on '{}' which does not run earlier in this sequence",
                            beat.event_name, dependency
                        ));
                    }
                }
                TimingMode::WaitForSignal { signal, .. } if signal.trim().is_empty() => {
                    return Err(invalid(format!(
                        "beat '{}' waits for an unnamed signal",
                        beat.event_name
                    )));
                }
                _ => {}
            }
            seen_events.insert(beat.event_name.as_str());
        }
    }

    let mut resources = HashSet::new();
    for requirement in &def.resources {
        if !resources.insert(requirement.id.as_str()) {
            warnings.push(format!("resource '{}' declared twice", requirement.id));
        }
    }

    Ok(warnings)
}
