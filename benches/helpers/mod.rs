use std::sync::Arc;

use serde_json::{json, Value};
use tokio::runtime::Runtime;

use xconductor::{
    handler_fn, BeatDefinition, FakeIdGenerator, HandlerMap, MovementDefinition, Orchestrator,
    SequenceDefinition,
};

pub fn bench_runtime() -> Runtime {
    Runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build runtime")
}

/// An orchestrator with a `beats`-long no-op sequence mounted as `bench`.
pub fn bench_orchestrator(beats: u32) -> Orchestrator {
    let orchestrator = Orchestrator::builder()
        .id_generator(Arc::new(FakeIdGenerator::new("bench")))
        .build();
    let events: Vec<String> = (1..=beats).map(|i| format!("beat{}", i)).collect();
    let definition = SequenceDefinition::new("bench", "bench").movement(MovementDefinition::new(
        "main",
        events
            .iter()
            .enumerate()
            .map(|(i, e)| BeatDefinition::new(i as u32 + 1, e.as_str()))
            .collect(),
    ));
    let handlers: HandlerMap = events
        .into_iter()
        .map(|e| {
            let handler = handler_fn(|_payload, _ctx| async { Ok(Value::Null) });
            (e, handler)
        })
        .collect();
    orchestrator.mount(definition, handlers, "bench-plugin");
    orchestrator
}

/// A nested payload with `width` keys per level.
pub fn bench_payload(width: usize) -> Value {
    let inner: serde_json::Map<String, Value> = (0..width)
        .map(|i| (format!("k{}", width - i), json!({ "v": i, "tags": ["a", "b"] })))
        .collect();
    json!({ "timestamp": 1_700_000_000_000u64, "body": inner })
}
