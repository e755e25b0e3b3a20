use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ErrorContext;

/// A beat whose handler settled successfully.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedBeat {
    pub movement: String,
    pub step_number: u32,
    pub event_name: String,
    pub duration_ms: u64,
}

/// A beat failure recorded on the run, whatever its policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeatError {
    pub movement: String,
    pub step_number: u32,
    pub event_name: String,
    pub error: ErrorContext,
}

/// Mutable state of the one active run.
///
/// Owned exclusively by the executor for the duration of a run and dropped
/// when the run reaches a terminal state.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub request_id: String,
    pub sequence_id: String,
    pub current_movement_index: usize,
    pub current_beat_index: usize,
    pub baton: Map<String, Value>,
    pub completed_beats: Vec<CompletedBeat>,
    pub errors: Vec<BeatError>,
    pub started_at: DateTime<Utc>,
}

impl ExecutionContext {
    /// Seed the baton from the submission payload: objects are taken as-is,
    /// null starts empty, anything else lands under `payload`.
    pub fn new(request_id: &str, sequence_id: &str, payload: &Value) -> Self {
        let baton = match payload {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("payload".to_string(), other.clone());
                map
            }
        };
        Self {
            request_id: request_id.to_string(),
            sequence_id: sequence_id.to_string(),
            current_movement_index: 0,
            current_beat_index: 0,
            baton,
            completed_beats: Vec::new(),
            errors: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn baton_snapshot(&self) -> Value {
        Value::Object(self.baton.clone())
    }

    /// Merge a handler outcome into the baton. Object keys overwrite, null is
    /// ignored, other values are stored under the event name.
    pub fn absorb(&mut self, event_name: &str, outcome: Value) {
        match outcome {
            Value::Object(map) => {
                for (k, v) in map {
                    self.baton.insert(k, v);
                }
            }
            Value::Null => {}
            other => {
                self.baton.insert(event_name.to_string(), other);
            }
        }
    }

    pub fn has_completed(&self, event_name: &str) -> bool {
        self.completed_beats
            .iter()
            .any(|beat| beat.event_name == event_name)
    }
}
