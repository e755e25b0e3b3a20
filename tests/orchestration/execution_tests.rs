use serde_json::{json, Value};
use std::time::Duration;

use xconductor::{
    BeatDefinition, ErrorCode, ErrorPolicy, HandlerMap, MovementDefinition, Orchestrator,
    OrchestratorConfig, Priority, RunStatus, SequenceDefinition, TimingMode,
};

use super::helpers::{orchestrator, single_movement, until_active, wait_beat, CallLog};

#[tokio::test]
async fn test_beats_run_in_movement_then_step_order() {
    let (orch, recorder) = orchestrator();
    let log = CallLog::new();
    // Declared out of step order on purpose.
    let def = SequenceDefinition::new("ordered", "Ordered")
        .movement(MovementDefinition::new(
            "M1",
            vec![BeatDefinition::new(2, "b2"), BeatDefinition::new(1, "b1")],
        ))
        .movement(MovementDefinition::new("M2", vec![BeatDefinition::new(1, "b3")]));
    let mut handlers = HandlerMap::new();
    for event in ["b1", "b2", "b3"] {
        handlers.insert(event.to_string(), log.handler(json!({ event: true })));
    }
    orch.mount(def, handlers, "p");

    let submitted = orch.submit("ordered", Value::Null, Priority::Normal);
    let result = orch.wait(&submitted.request_id).await.unwrap();

    assert_eq!(log.events(), vec!["b1", "b2", "b3"]);
    assert_eq!(result.beat_events(), vec!["b1", "b2", "b3"]);
    assert_eq!(result.baton, json!({"b1": true, "b2": true, "b3": true}));
    assert_eq!(result.completed_beats[2].movement, "M2");
    assert_eq!(
        recorder
            .names_for(&submitted.request_id)
            .iter()
            .filter(|name| **name == "beat:completed")
            .count(),
        3
    );
}

#[tokio::test]
async fn test_continue_policy_completes_with_errors() {
    let (orch, _) = orchestrator();
    let log = CallLog::new();
    let def = single_movement(
        "lenient",
        vec![
            BeatDefinition::new(1, "first").error_policy(ErrorPolicy::Continue),
            BeatDefinition::new(2, "second"),
        ],
    );
    let mut handlers = HandlerMap::new();
    handlers.insert("first".to_string(), log.failing("flaky"));
    handlers.insert("second".to_string(), log.handler(json!({"ok": true})));
    orch.mount(def, handlers, "p");

    let submitted = orch.submit("lenient", Value::Null, Priority::Normal);
    let result = orch.wait(&submitted.request_id).await.unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(log.events(), vec!["first", "second"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].event_name, "first");
    assert_eq!(result.errors[0].error.code, ErrorCode::HandlerFailed);
    assert!(result.failure.is_none());
    assert_eq!(orch.statistics().beats_failed, 1);
}

#[tokio::test]
async fn test_abort_policy_stops_the_run() {
    let (orch, recorder) = orchestrator();
    let log = CallLog::new();
    let def = single_movement(
        "strict",
        vec![
            BeatDefinition::new(1, "first").error_policy(ErrorPolicy::Abort),
            BeatDefinition::new(2, "second"),
        ],
    );
    let mut handlers = HandlerMap::new();
    handlers.insert("first".to_string(), log.failing("disk full"));
    handlers.insert("second".to_string(), log.handler(json!({"ok": true})));
    orch.mount(def, handlers, "p");

    let submitted = orch.submit("strict", Value::Null, Priority::Normal);
    let result = orch.wait(&submitted.request_id).await.unwrap();

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(log.events(), vec!["first"]);
    let failure = result.failure.unwrap();
    assert!(failure.contains("first"));
    assert!(failure.contains("disk full"));
    assert!(recorder
        .names_for(&submitted.request_id)
        .ends_with(&["beat:failed", "sequence:failed"]));
}

#[tokio::test]
async fn test_missing_handler_is_a_beat_failure() {
    let (orch, _) = orchestrator();
    orch.register(single_movement(
        "bare",
        vec![BeatDefinition::new(1, "nobody").error_policy(ErrorPolicy::Continue)],
    ))
    .unwrap();

    let submitted = orch.submit("bare", Value::Null, Priority::Normal);
    let result = orch.wait(&submitted.request_id).await.unwrap();
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.errors[0].error.code, ErrorCode::HandlerNotFound);
}

#[tokio::test]
async fn test_after_dependency_gate() {
    let (orch, _) = orchestrator();
    let log = CallLog::new();
    let def = single_movement(
        "deps",
        vec![
            BeatDefinition::new(1, "prepare"),
            BeatDefinition::new(2, "apply").timing(TimingMode::AfterDependency {
                dependency: "prepare".into(),
            }),
            BeatDefinition::new(3, "orphan")
                .timing(TimingMode::AfterDependency {
                    dependency: "never-ran".into(),
                })
                .error_policy(ErrorPolicy::Continue),
        ],
    );
    let mut handlers = HandlerMap::new();
    for event in ["prepare", "apply", "orphan"] {
        handlers.insert(event.to_string(), log.handler(Value::Null));
    }
    orch.mount(def, handlers, "p");

    let submitted = orch.submit("deps", Value::Null, Priority::Normal);
    let result = orch.wait(&submitted.request_id).await.unwrap();
    assert_eq!(log.events(), vec!["prepare", "apply"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].error.code, ErrorCode::DependencyNotSatisfied);
}

#[tokio::test(start_paused = true)]
async fn test_delayed_beat_waits() {
    let (orch, _) = orchestrator();
    let log = CallLog::new();
    let def = single_movement(
        "slow",
        vec![BeatDefinition::new(1, "later").timing(TimingMode::Delayed { delay_ms: 500 })],
    );
    let mut handlers = HandlerMap::new();
    handlers.insert("later".to_string(), log.handler(Value::Null));
    orch.mount(def, handlers, "p");

    let started = tokio::time::Instant::now();
    let submitted = orch.submit("slow", Value::Null, Priority::Normal);
    orch.wait(&submitted.request_id).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(log.events(), vec!["later"]);
}

#[tokio::test]
async fn test_signal_releases_waiting_beat() {
    let (orch, _) = orchestrator();
    let log = CallLog::new();
    let def = single_movement(
        "approval",
        vec![
            BeatDefinition::new(1, "request"),
            wait_beat(2, "approved", "approve"),
        ],
    );
    let mut handlers = HandlerMap::new();
    handlers.insert("request".to_string(), log.handler(Value::Null));
    handlers.insert("approved".to_string(), log.handler(json!({"approved": true})));
    orch.mount(def, handlers, "p");

    let submitted = orch.submit("approval", Value::Null, Priority::Normal);
    until_active(&orch, &submitted.request_id).await;
    while log.events().is_empty() {
        tokio::task::yield_now().await;
    }
    assert_eq!(orch.status(&submitted.request_id), Some(RunStatus::Running));

    orch.signal("approve");
    let result = orch.wait(&submitted.request_id).await.unwrap();
    assert_eq!(result.baton["approved"], json!(true));
}

#[tokio::test(start_paused = true)]
async fn test_signal_timeout_follows_policy() {
    let (orch, _) = orchestrator();
    let def = single_movement(
        "impatient",
        vec![BeatDefinition::new(1, "wait").timing(TimingMode::WaitForSignal {
            signal: "never".into(),
            timeout_ms: Some(100),
        })],
    );
    let mut handlers = HandlerMap::new();
    handlers.insert("wait".to_string(), CallLog::new().handler(Value::Null));
    orch.mount(def, handlers, "p");

    let submitted = orch.submit("impatient", Value::Null, Priority::Normal);
    let result = orch.wait(&submitted.request_id).await.unwrap();
    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.failure.unwrap().contains("not raised within 100ms"));
}

#[tokio::test]
async fn test_cancel_running_request_records_synthetic_error() {
    let (orch, recorder) = orchestrator();
    let log = CallLog::new();
    let def = single_movement(
        "long",
        vec![
            BeatDefinition::new(1, "start"),
            wait_beat(2, "finish", "never"),
            BeatDefinition::new(3, "cleanup"),
        ],
    );
    let mut handlers = HandlerMap::new();
    for event in ["start", "finish", "cleanup"] {
        handlers.insert(event.to_string(), log.handler(Value::Null));
    }
    orch.mount(def, handlers, "p");

    let submitted = orch.submit("long", Value::Null, Priority::Normal);
    until_active(&orch, &submitted.request_id).await;
    assert!(orch.cancel(&submitted.request_id));

    let result = orch.wait(&submitted.request_id).await.unwrap();
    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(!log.events().contains(&"cleanup".to_string()));
    let last = result.errors.last().unwrap();
    assert_eq!(last.error.code, ErrorCode::RunCancelled);
    assert_eq!(result.failure.as_deref(), Some("cancelled by caller"));
    assert_eq!(
        recorder.names_for(&submitted.request_id).last(),
        Some(&"sequence:cancelled")
    );
    orch.wait_idle().await;
    assert!(!orch.cancel(&submitted.request_id));
}

#[tokio::test(start_paused = true)]
async fn test_run_timeout_fails_stuck_run() {
    let orch = Orchestrator::builder()
        .config(OrchestratorConfig {
            run_timeout_ms: Some(250),
            ..OrchestratorConfig::default()
        })
        .build();
    let def = single_movement("stuck", vec![wait_beat(1, "forever", "never")]);
    let mut handlers = HandlerMap::new();
    handlers.insert("forever".to_string(), CallLog::new().handler(Value::Null));
    orch.mount(def, handlers, "p");

    let submitted = orch.submit("stuck", Value::Null, Priority::Normal);
    let result = orch.wait(&submitted.request_id).await.unwrap();
    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.failure.as_deref(), Some("Run timed out after 250ms"));
    assert_eq!(result.errors[0].error.code, ErrorCode::Timeout);
}

#[tokio::test]
async fn test_history_and_statistics_after_mixed_runs() {
    let (orch, _) = orchestrator();
    let log = CallLog::new();
    let mut handlers = HandlerMap::new();
    handlers.insert("ok".to_string(), log.handler(Value::Null));
    orch.mount(
        single_movement("good", vec![BeatDefinition::new(1, "ok")]),
        handlers,
        "p",
    );
    let mut bad = HandlerMap::new();
    bad.insert("bad".to_string(), log.failing("nope"));
    orch.mount(
        single_movement("broken", vec![BeatDefinition::new(1, "bad")]),
        bad,
        "q",
    );

    orch.submit("good", json!({"n": 1}), Priority::Normal);
    orch.submit("broken", json!({"n": 2}), Priority::Normal);
    orch.submit("good", json!({"n": 3}), Priority::Normal);
    orch.wait_idle().await;

    let records = orch.history().records();
    let statuses: Vec<RunStatus> = records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![RunStatus::Completed, RunStatus::Failed, RunStatus::Completed]
    );
    let stats = orch.statistics();
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.beats_run, 3);
    assert_eq!(stats.finished_runs(), 3);
}
