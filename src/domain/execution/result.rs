use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{BeatError, CompletedBeat, ExecutionContext, RunStatus};

/// Final outcome of a run.
///
/// `errors` may be non-empty on a completed run when every failing beat
/// used the `continue` policy.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub request_id: String,
    pub sequence_id: String,
    pub status: RunStatus,
    pub baton: Value,
    pub completed_beats: Vec<CompletedBeat>,
    pub errors: Vec<BeatError>,
    /// Set when the run did not complete.
    pub failure: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn from_context(
        context: ExecutionContext,
        status: RunStatus,
        failure: Option<String>,
    ) -> Self {
        let finished_at = Utc::now();
        let duration_ms = (finished_at - context.started_at)
            .num_milliseconds()
            .max(0) as u64;
        Self {
            request_id: context.request_id,
            sequence_id: context.sequence_id,
            status,
            baton: Value::Object(context.baton),
            completed_beats: context.completed_beats,
            errors: context.errors,
            failure,
            started_at: context.started_at,
            finished_at,
            duration_ms,
        }
    }

    /// Result for a request that terminated before any beat ran.
    pub fn not_started(
        request_id: &str,
        sequence_id: &str,
        status: RunStatus,
        failure: impl Into<String>,
    ) -> Self {
        let context = ExecutionContext::new(request_id, sequence_id, &Value::Null);
        Self::from_context(context, status, Some(failure.into()))
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Event names of completed beats, in completion order.
    pub fn beat_events(&self) -> Vec<&str> {
        self.completed_beats
            .iter()
            .map(|beat| beat.event_name.as_str())
            .collect()
    }
}
