use serde_json::{json, Value};
use std::sync::Arc;

use xconductor::{
    create_event_channel, handler_fn, BeatDefinition, ErrorPolicy, HandlerError, HandlerMap,
    MovementDefinition, Orchestrator, Priority, ResourceRequirement, SequenceDefinition,
};

fn drop_symphony() -> SequenceDefinition {
    SequenceDefinition::new("drop-symphony", "Drop Symphony")
        .movement(MovementDefinition::new(
            "drop",
            vec![
                BeatDefinition::new(1, "validate"),
                BeatDefinition::new(2, "commit"),
                BeatDefinition::new(3, "notify").error_policy(ErrorPolicy::Continue),
            ],
        ))
        .resource(ResourceRequirement::timing("canvas"))
}

fn drop_handlers() -> HandlerMap {
    let mut handlers = HandlerMap::new();
    handlers.insert(
        "validate".to_string(),
        handler_fn(|payload: Value, ctx| async move {
            println!("  [{}] validate <- {}", ctx.request_id, payload);
            let valid = payload["x"].is_number() && payload["y"].is_number();
            if !valid {
                return Err(HandlerError::InvalidPayload("x and y must be numbers".into()));
            }
            Ok(json!({ "valid": true }))
        }),
    );
    handlers.insert(
        "commit".to_string(),
        handler_fn(|payload: Value, ctx| async move {
            println!("  [{}] commit   <- {}", ctx.request_id, payload);
            Ok(json!({ "committed": true, "position": [payload["x"], payload["y"]] }))
        }),
    );
    handlers.insert(
        "notify".to_string(),
        handler_fn(|_payload: Value, _ctx| async move {
            Err(HandlerError::failed("no subscribers listening"))
        }),
    );
    handlers
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== xconductor ===\n");

    let (publisher, mut events) = create_event_channel();
    let orchestrator = Orchestrator::builder()
        .publisher(Arc::new(publisher))
        .build();

    let mounted = orchestrator.mount(drop_symphony(), drop_handlers(), "canvas-drop");
    println!(
        "[OK] Mounted '{}' from plugin '{}' ({} warnings)",
        mounted.sequence_id,
        mounted.plugin_id,
        mounted.warnings.len()
    );

    let submitted = orchestrator.submit("drop-symphony", json!({"x": 10, "y": 20}), Priority::Normal);
    println!(
        "[OK] Submitted {} (accepted={}, duplicate={})",
        submitted.request_id, submitted.accepted, submitted.is_duplicate
    );

    let again = orchestrator.submit("drop-symphony", json!({"y": 20, "x": 10}), Priority::Normal);
    println!(
        "[OK] Resubmitted same drop: accepted={}, duplicate={}",
        again.accepted, again.is_duplicate
    );

    let missing = orchestrator.submit("no-such-sequence", Value::Null, Priority::High);
    println!(
        "[OK] Unknown sequence: accepted={}, reason={}",
        missing.accepted,
        missing.reason.unwrap_or_default()
    );

    match orchestrator.wait(&submitted.request_id).await {
        Some(result) => {
            println!("\n--- Result ---");
            println!("  status: {:?}", result.status);
            println!("  beats:  {:?}", result.beat_events());
            println!("  errors: {}", result.errors.len());
            println!("  baton:  {}", result.baton);
        }
        None => println!("\n[!!] Request {} was not tracked", submitted.request_id),
    }

    orchestrator.wait_idle().await;
    drop(orchestrator);

    println!("\n--- Events ---");
    while let Ok(event) = events.try_recv() {
        println!("  {}", event.name());
    }
}
