#![allow(unused)]

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

use xconductor::{
    handler_fn, BeatDefinition, BeatHandler, FakeIdGenerator, HandlerError, HandlerMap,
    MovementDefinition, Orchestrator, RecordingPublisher, SequenceDefinition, TimingMode,
};

/// Shared log of `(request_id, event_name, payload)` seen by handlers.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<(String, String, Value)>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that records its call and returns `outcome`.
    pub fn handler(&self, outcome: Value) -> Arc<dyn BeatHandler> {
        let calls = self.calls.clone();
        handler_fn(move |payload, ctx| {
            let calls = calls.clone();
            let outcome = outcome.clone();
            async move {
                calls
                    .lock()
                    .push((ctx.request_id.clone(), ctx.event_name.clone(), payload));
                Ok(outcome)
            }
        })
    }

    /// A handler that records its call and fails.
    pub fn failing(&self, message: &str) -> Arc<dyn BeatHandler> {
        let calls = self.calls.clone();
        let message = message.to_string();
        handler_fn(move |payload, ctx| {
            let calls = calls.clone();
            let message = message.clone();
            async move {
                calls
                    .lock()
                    .push((ctx.request_id.clone(), ctx.event_name.clone(), payload));
                Err(HandlerError::failed(message))
            }
        })
    }

    pub fn events(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(_, e, _)| e.clone()).collect()
    }

    pub fn requests(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for (request_id, _, _) in self.calls.lock().iter() {
            if seen.last() != Some(request_id) {
                seen.push(request_id.clone());
            }
        }
        seen
    }

    pub fn payload_of(&self, event: &str) -> Option<Value> {
        self.calls
            .lock()
            .iter()
            .find(|(_, e, _)| e == event)
            .map(|(_, _, p)| p.clone())
    }
}

pub fn orchestrator() -> (Orchestrator, Arc<RecordingPublisher>) {
    let recorder = Arc::new(RecordingPublisher::new());
    let orchestrator = Orchestrator::builder()
        .publisher(recorder.clone())
        .id_generator(Arc::new(FakeIdGenerator::new("req")))
        .build();
    (orchestrator, recorder)
}

pub fn single_movement(id: &str, beats: Vec<BeatDefinition>) -> SequenceDefinition {
    SequenceDefinition::new(id, id).movement(MovementDefinition::new("main", beats))
}

pub fn wait_beat(step: u32, event: &str, signal: &str) -> BeatDefinition {
    BeatDefinition::new(step, event).timing(TimingMode::WaitForSignal {
        signal: signal.to_string(),
        timeout_ms: None,
    })
}

/// Mount a one-beat sequence that holds the execution slot until `signal`.
pub fn mount_gate(orchestrator: &Orchestrator, id: &str, signal: &str) {
    let mut handlers = HandlerMap::new();
    handlers.insert(
        "hold".to_string(),
        handler_fn(|_payload, _ctx| async { Ok(Value::Null) }),
    );
    let result = orchestrator.mount(
        single_movement(id, vec![wait_beat(1, "hold", signal)]),
        handlers,
        &format!("{}-plugin", id),
    );
    assert!(result.success);
}

/// Yield until `request_id` holds the execution slot.
pub async fn until_active(orchestrator: &Orchestrator, request_id: &str) {
    while orchestrator.active_request().as_deref() != Some(request_id) {
        tokio::task::yield_now().await;
    }
}

pub fn point(x: i64, y: i64) -> Value {
    json!({ "x": x, "y": y })
}
