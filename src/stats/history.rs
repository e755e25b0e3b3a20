use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

use crate::domain::execution::{ExecutionResult, RunStatus};
use crate::domain::model::Priority;

/// Summary of one finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    pub request_id: String,
    pub sequence_id: String,
    pub priority: Priority,
    pub status: RunStatus,
    pub beats_completed: usize,
    pub error_count: usize,
    pub failure: Option<String>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExecutionRecord {
    pub fn from_result(result: &ExecutionResult, priority: Priority) -> Self {
        Self {
            request_id: result.request_id.clone(),
            sequence_id: result.sequence_id.clone(),
            priority,
            status: result.status,
            beats_completed: result.completed_beats.len(),
            error_count: result.errors.len(),
            failure: result.failure.clone(),
            finished_at: result.finished_at,
            duration_ms: result.duration_ms,
        }
    }
}

/// Size-capped log of finished runs; the oldest record is evicted first.
#[derive(Debug)]
pub struct ExecutionHistory {
    records: Mutex<VecDeque<ExecutionRecord>>,
    capacity: usize,
}

impl ExecutionHistory {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn record(&self, record: ExecutionRecord) {
        if self.capacity == 0 {
            return;
        }
        let mut records = self.records.lock();
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    /// Records, oldest first.
    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn recent(&self, limit: usize) -> Vec<ExecutionRecord> {
        let records = self.records.lock();
        let skip = records.len().saturating_sub(limit);
        records.iter().skip(skip).cloned().collect()
    }

    pub fn find(&self, request_id: &str) -> Option<ExecutionRecord> {
        self.records
            .lock()
            .iter()
            .rev()
            .find(|r| r.request_id == request_id)
            .cloned()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}
