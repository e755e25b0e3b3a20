//! Lifecycle notifications published by the orchestrator.
//!
//! Publishing is fire-and-forget: a publisher never blocks the caller and a
//! missing or slow subscriber never affects a run.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::domain::model::{ErrorPolicy, Priority};

/// Orchestration event - delivered through an [`EventPublisher`]
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    SequenceQueued {
        request_id: String,
        sequence_id: String,
        priority: Priority,
        queue_depth: usize,
        timestamp: DateTime<Utc>,
    },
    SequenceStarted {
        request_id: String,
        sequence_id: String,
        timestamp: DateTime<Utc>,
    },
    BeatStarted {
        request_id: String,
        sequence_id: String,
        movement: String,
        step_number: u32,
        event_name: String,
        dynamics: u8,
        timestamp: DateTime<Utc>,
    },
    BeatCompleted {
        request_id: String,
        sequence_id: String,
        movement: String,
        step_number: u32,
        event_name: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    BeatFailed {
        request_id: String,
        sequence_id: String,
        movement: String,
        step_number: u32,
        event_name: String,
        error: String,
        policy: ErrorPolicy,
        timestamp: DateTime<Utc>,
    },
    SequenceCompleted {
        request_id: String,
        sequence_id: String,
        duration_ms: u64,
        error_count: usize,
        timestamp: DateTime<Utc>,
    },
    SequenceFailed {
        request_id: String,
        sequence_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    SequenceCancelled {
        request_id: String,
        sequence_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    DuplicateSubmission {
        sequence_id: String,
        fingerprint: String,
        timestamp: DateTime<Utc>,
    },
    SubmissionRejected {
        sequence_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl OrchestrationEvent {
    /// Stable wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            OrchestrationEvent::SequenceQueued { .. } => "sequence:queued",
            OrchestrationEvent::SequenceStarted { .. } => "sequence:started",
            OrchestrationEvent::BeatStarted { .. } => "beat:started",
            OrchestrationEvent::BeatCompleted { .. } => "beat:completed",
            OrchestrationEvent::BeatFailed { .. } => "beat:failed",
            OrchestrationEvent::SequenceCompleted { .. } => "sequence:completed",
            OrchestrationEvent::SequenceFailed { .. } => "sequence:failed",
            OrchestrationEvent::SequenceCancelled { .. } => "sequence:cancelled",
            OrchestrationEvent::DuplicateSubmission { .. } => "sequence:duplicate",
            OrchestrationEvent::SubmissionRejected { .. } => "sequence:rejected",
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            OrchestrationEvent::SequenceQueued { request_id, .. }
            | OrchestrationEvent::SequenceStarted { request_id, .. }
            | OrchestrationEvent::BeatStarted { request_id, .. }
            | OrchestrationEvent::BeatCompleted { request_id, .. }
            | OrchestrationEvent::BeatFailed { request_id, .. }
            | OrchestrationEvent::SequenceCompleted { request_id, .. }
            | OrchestrationEvent::SequenceFailed { request_id, .. }
            | OrchestrationEvent::SequenceCancelled { request_id, .. } => Some(request_id),
            OrchestrationEvent::DuplicateSubmission { .. }
            | OrchestrationEvent::SubmissionRejected { .. } => None,
        }
    }

    /// JSON payload as seen by transport subscribers.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Notification sink. Implementations must not block.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: OrchestrationEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: OrchestrationEvent) {}
}

/// Event receiver
pub type EventReceiver = mpsc::UnboundedReceiver<OrchestrationEvent>;

/// Forwards events into an unbounded channel, with an atomic active flag so
/// emission can be cheaply skipped once the listener goes away.
#[derive(Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<OrchestrationEvent>,
    active: Arc<AtomicBool>,
}

impl ChannelPublisher {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: OrchestrationEvent) {
        if !self.is_active() {
            return;
        }
        if self.tx.send(event).is_err() {
            self.active.store(false, Ordering::Relaxed);
        }
    }
}

/// Create a publisher and its receiving end
pub fn create_event_channel() -> (ChannelPublisher, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelPublisher {
            tx,
            active: Arc::new(AtomicBool::new(true)),
        },
        rx,
    )
}

/// Keeps every event in memory, for tests and debugging.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<OrchestrationEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OrchestrationEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.name()).collect()
    }

    /// Event names for one request, in publish order.
    pub fn names_for(&self, request_id: &str) -> Vec<&'static str> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.request_id() == Some(request_id))
            .map(|e| e.name())
            .collect()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: OrchestrationEvent) {
        self.events.lock().push(event);
    }
}
