use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{Priority, ResourceRequirement};

/// An admitted unit of work waiting for (or holding) the execution slot.
///
/// Built once during admission and never mutated afterwards; the drain loop
/// consumes it exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest {
    pub request_id: String,
    pub sequence_id: String,
    pub payload: Value,
    pub priority: Priority,
    pub submitted_at: DateTime<Utc>,
    pub fingerprint: String,
    /// Sequence-declared claims followed by submission-level claims.
    pub resources: Vec<ResourceRequirement>,
}
