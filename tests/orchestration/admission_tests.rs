use serde_json::{json, Value};
use std::sync::Arc;

use xconductor::{
    BeatDefinition, ConflictResolver, Decision, DedupConfig, ErrorCode, FakeTimeProvider,
    HandlerMap, LeasePolicy, Orchestrator, OrchestratorConfig, Priority, QueueConfig,
    ResourceLedger, ResourceRequirement, RunStatus, Submission,
};

use super::helpers::{mount_gate, orchestrator, point, single_movement, until_active, CallLog};

fn mount_drop(orchestrator: &Orchestrator, log: &CallLog) {
    let mut handlers = HandlerMap::new();
    handlers.insert("place".to_string(), log.handler(json!({"placed": true})));
    orchestrator.mount(
        single_movement("drop", vec![BeatDefinition::new(1, "place")]),
        handlers,
        "drop-plugin",
    );
}

#[tokio::test]
async fn test_priority_order_while_run_in_progress() {
    let (orch, _) = orchestrator();
    let log = CallLog::new();
    mount_drop(&orch, &log);
    mount_gate(&orch, "gate", "open");

    let gate = orch.submit("gate", Value::Null, Priority::Normal);
    until_active(&orch, &gate.request_id).await;

    let a = orch.submit("drop", json!({"n": "A"}), Priority::Normal);
    let b = orch.submit("drop", json!({"n": "B"}), Priority::High);
    let c = orch.submit("drop", json!({"n": "C"}), Priority::Normal);
    assert_eq!(
        orch.pending(),
        vec![
            b.request_id.clone(),
            a.request_id.clone(),
            c.request_id.clone()
        ]
    );

    orch.signal("open");
    orch.wait_idle().await;
    assert_eq!(log.requests(), vec![b.request_id, a.request_id, c.request_id]);
}

#[tokio::test]
async fn test_chained_drains_after_normal() {
    let (orch, _) = orchestrator();
    let log = CallLog::new();
    mount_drop(&orch, &log);
    mount_gate(&orch, "gate", "open");

    let gate = orch.submit("gate", Value::Null, Priority::Normal);
    until_active(&orch, &gate.request_id).await;

    let chained = orch.submit("drop", json!({"n": 1}), Priority::Chained);
    let normal = orch.submit("drop", json!({"n": 2}), Priority::Normal);
    let high = orch.submit("drop", json!({"n": 3}), Priority::High);
    orch.signal("open");
    orch.wait_idle().await;
    assert_eq!(
        log.requests(),
        vec![high.request_id, normal.request_id, chained.request_id]
    );
}

#[tokio::test]
async fn test_duplicate_blocked_until_started_then_readmitted() {
    let (orch, recorder) = orchestrator();
    let log = CallLog::new();
    mount_drop(&orch, &log);
    mount_gate(&orch, "gate", "open");

    let gate = orch.submit("gate", Value::Null, Priority::Normal);
    until_active(&orch, &gate.request_id).await;

    let first = orch.submit("drop", point(10, 20), Priority::Normal);
    // key order does not change the fingerprint
    let second = orch.submit("drop", json!({"y": 20, "x": 10}), Priority::Normal);
    assert!(first.accepted);
    assert!(second.is_duplicate);
    assert!(!second.accepted);
    assert_eq!(orch.status(&second.request_id), None);
    assert!(recorder.names().contains(&"sequence:duplicate"));

    // same payload at another priority is a different submission
    let other_priority = orch.submit("drop", point(10, 20), Priority::High);
    assert!(other_priority.accepted);

    orch.signal("open");
    orch.wait(&first.request_id).await.unwrap();
    let third = orch.submit("drop", point(10, 20), Priority::Normal);
    assert!(third.accepted);
    assert!(!third.is_duplicate);
    orch.wait_idle().await;

    let stats = orch.statistics();
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.accepted, 4);
}

#[tokio::test]
async fn test_rapid_reinvocation_with_timestamps() {
    let clock = Arc::new(FakeTimeProvider::new(1_000));
    let orch = Orchestrator::builder()
        .time_provider(clock.clone())
        .config(OrchestratorConfig {
            dedup: DedupConfig {
                heuristic_window_ms: 10,
                ..DedupConfig::default()
            },
            ..OrchestratorConfig::default()
        })
        .build();
    let log = CallLog::new();
    mount_drop(&orch, &log);
    mount_gate(&orch, "gate", "open");
    let gate = orch.submit("gate", Value::Null, Priority::Normal);
    until_active(&orch, &gate.request_id).await;

    let first = orch.submit("drop", json!({"x": 1, "timestamp": 1_000}), Priority::Normal);
    clock.advance(3);
    let echo = orch.submit("drop", json!({"x": 1, "timestamp": 1_003}), Priority::Normal);
    clock.advance(50);
    let later = orch.submit("drop", json!({"x": 1, "timestamp": 1_053}), Priority::Normal);

    assert!(first.accepted);
    assert!(echo.is_duplicate);
    assert!(later.accepted);
    orch.signal("open");
    orch.wait_idle().await;
}

#[test]
fn test_resource_exclusivity_for_equal_and_lower_priority() {
    let resolver = ConflictResolver::new(Arc::new(ResourceLedger::new()), LeasePolicy::default());
    assert!(resolver.acquire("canvas", "x", Priority::Normal).is_allow());

    for priority in [Priority::Normal, Priority::Chained] {
        let decision = resolver.acquire("canvas", "y", priority);
        assert!(matches!(decision, Decision::Queue { ref owner, .. } if owner == "x"));
    }
    // a stale release from the loser changes nothing
    assert!(!resolver.release("canvas", "y"));
    assert_eq!(
        resolver.ledger().ownership("canvas").unwrap().owner_request_id,
        "x"
    );
}

#[tokio::test]
async fn test_hard_access_resource_rejects_submission() {
    let (orch, recorder) = orchestrator();
    mount_gate(&orch, "gate", "open");
    let claim = || ResourceRequirement::hard_access("settings.json");

    let holder = orch.submit_with(Submission::new("gate", json!({"n": 1})).resource(claim()));
    let contender = orch.submit_with(
        Submission::new("gate", json!({"n": 2}))
            .priority(Priority::High)
            .resource(claim()),
    );
    assert!(holder.accepted);
    assert!(!contender.accepted);
    assert_eq!(contender.code, Some(ErrorCode::ResourceConflict));
    assert!(contender
        .reason
        .as_deref()
        .unwrap()
        .contains(&holder.request_id));
    assert!(recorder.names().contains(&"sequence:rejected"));

    orch.signal("open");
    orch.wait(&holder.request_id).await.unwrap();
    assert!(orch.resolver().ledger().ownership("settings.json").is_none());
}

#[tokio::test]
async fn test_high_priority_preempts_timing_resource() {
    let (orch, _) = orchestrator();
    mount_gate(&orch, "gate", "open");
    let claim = || ResourceRequirement::timing("canvas");

    let gate = orch.submit("gate", Value::Null, Priority::Normal);
    until_active(&orch, &gate.request_id).await;

    let normal = orch.submit_with(Submission::new("gate", json!({"n": 1})).resource(claim()));
    let high = orch.submit_with(
        Submission::new("gate", json!({"n": 2}))
            .priority(Priority::High)
            .resource(claim()),
    );
    assert!(normal.accepted);
    assert!(high.accepted);
    let owner = orch.resolver().ledger().ownership("canvas").unwrap();
    assert_eq!(owner.owner_request_id, high.request_id);

    for _ in 0..3 {
        orch.signal("open");
    }
    let first = orch.wait(&high.request_id).await.unwrap();
    let second = orch.wait(&normal.request_id).await.unwrap();
    assert!(first.finished_at <= second.started_at);
    orch.wait_idle().await;
}

#[tokio::test]
async fn test_cancel_running_request_frees_resources_before_it_settles() {
    let (orch, _) = orchestrator();
    mount_gate(&orch, "gate", "open");
    let claim = || ResourceRequirement::timing("canvas");

    let holder = orch.submit_with(Submission::new("gate", json!({"n": 1})).resource(claim()));
    until_active(&orch, &holder.request_id).await;
    assert!(orch.resolver().ledger().ownership("canvas").is_some());

    assert!(orch.cancel(&holder.request_id));
    assert!(orch.resolver().ledger().ownership("canvas").is_none());
    assert_eq!(
        orch.resolver().acquire("canvas", "bystander", Priority::Normal),
        Decision::Allow
    );
    assert!(orch.resolver().release("canvas", "bystander"));

    let next = orch.submit_with(Submission::new("gate", json!({"n": 2})).resource(claim()));
    assert!(next.accepted);
    assert_eq!(
        orch.resolver().ledger().ownership("canvas").unwrap().owner_request_id,
        next.request_id
    );

    let cancelled = orch.wait(&holder.request_id).await.unwrap();
    assert_eq!(cancelled.status, RunStatus::Cancelled);
    orch.signal("open");
    let finished = orch.wait(&next.request_id).await.unwrap();
    assert_eq!(finished.status, RunStatus::Completed);
    assert!(orch.resolver().ledger().ownership("canvas").is_none());
}

#[tokio::test]
async fn test_unknown_sequence_and_queue_capacity() {
    let orch = Orchestrator::builder()
        .config(OrchestratorConfig {
            queue: QueueConfig {
                max_pending: Some(2),
            },
            ..OrchestratorConfig::default()
        })
        .build();
    mount_gate(&orch, "gate", "open");

    let missing = orch.submit("nope", Value::Null, Priority::Normal);
    assert_eq!(missing.code, Some(ErrorCode::SequenceNotFound));

    let gate = orch.submit("gate", json!({"n": 0}), Priority::Normal);
    until_active(&orch, &gate.request_id).await;
    let one = orch.submit("gate", json!({"n": 1}), Priority::Normal);
    let two = orch.submit("gate", json!({"n": 2}), Priority::Normal);
    let three = orch.submit("gate", json!({"n": 3}), Priority::High);
    assert!(one.accepted && two.accepted);
    assert_eq!(three.reason.as_deref(), Some("queue_full"));

    assert!(orch.cancel(&two.request_id));
    assert_eq!(orch.status(&two.request_id), Some(RunStatus::Cancelled));
    assert!(orch.submit("gate", json!({"n": 3}), Priority::High).accepted);

    for _ in 0..3 {
        orch.signal("open");
    }
    orch.wait_idle().await;
    assert_eq!(orch.statistics().rejected, 2);
}
