use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::domain::execution::RunStatus;

/// How a submission left admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Accepted,
    Duplicate,
    Rejected,
}

/// Observability hook. Never consulted for correctness.
pub trait StatisticsSink: Send + Sync {
    fn submission(&self, outcome: AdmissionOutcome);

    fn beat(&self, succeeded: bool);

    fn run_finished(&self, status: RunStatus, duration_ms: u64);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatistics;

impl StatisticsSink for NoopStatistics {
    fn submission(&self, _outcome: AdmissionOutcome) {}

    fn beat(&self, _succeeded: bool) {}

    fn run_finished(&self, _status: RunStatus, _duration_ms: u64) {}
}

/// Forwards to several sinks in order.
#[derive(Default, Clone)]
pub struct TeeStatistics {
    sinks: Vec<Arc<dyn StatisticsSink>>,
}

impl TeeStatistics {
    pub fn new(sinks: Vec<Arc<dyn StatisticsSink>>) -> Self {
        Self { sinks }
    }
}

impl StatisticsSink for TeeStatistics {
    fn submission(&self, outcome: AdmissionOutcome) {
        self.sinks.iter().for_each(|sink| sink.submission(outcome));
    }

    fn beat(&self, succeeded: bool) {
        self.sinks.iter().for_each(|sink| sink.beat(succeeded));
    }

    fn run_finished(&self, status: RunStatus, duration_ms: u64) {
        self.sinks
            .iter()
            .for_each(|sink| sink.run_finished(status, duration_ms));
    }
}

/// Thread-safe in-process counters.
#[derive(Debug, Default)]
pub struct InMemoryStatistics {
    submitted: AtomicU64,
    accepted: AtomicU64,
    duplicates: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    beats_run: AtomicU64,
    beats_failed: AtomicU64,
    total_run_ms: AtomicU64,
    max_run_ms: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub submitted: u64,
    pub accepted: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub beats_run: u64,
    pub beats_failed: u64,
    pub total_run_ms: u64,
    pub max_run_ms: u64,
    pub avg_run_ms: u64,
}

impl StatisticsSnapshot {
    pub fn finished_runs(&self) -> u64 {
        self.completed + self.failed + self.cancelled
    }
}

impl InMemoryStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let completed = self.completed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let cancelled = self.cancelled.load(Ordering::Relaxed);
        let total_run_ms = self.total_run_ms.load(Ordering::Relaxed);
        let finished = completed + failed + cancelled;
        let avg_run_ms = if finished > 0 {
            total_run_ms / finished
        } else {
            0
        };

        StatisticsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            completed,
            failed,
            cancelled,
            beats_run: self.beats_run.load(Ordering::Relaxed),
            beats_failed: self.beats_failed.load(Ordering::Relaxed),
            total_run_ms,
            max_run_ms: self.max_run_ms.load(Ordering::Relaxed),
            avg_run_ms,
        }
    }
}

impl StatisticsSink for InMemoryStatistics {
    fn submission(&self, outcome: AdmissionOutcome) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            AdmissionOutcome::Accepted => &self.accepted,
            AdmissionOutcome::Duplicate => &self.duplicates,
            AdmissionOutcome::Rejected => &self.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn beat(&self, succeeded: bool) {
        self.beats_run.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.beats_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn run_finished(&self, status: RunStatus, duration_ms: u64) {
        let counter = match status {
            RunStatus::Completed => &self.completed,
            RunStatus::Failed => &self.failed,
            RunStatus::Cancelled => &self.cancelled,
            RunStatus::Queued | RunStatus::Running => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.total_run_ms.fetch_add(duration_ms, Ordering::Relaxed);
        self.max_run_ms.fetch_max(duration_ms, Ordering::Relaxed);
    }
}
