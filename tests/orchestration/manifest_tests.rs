use serde_json::json;
use std::io::Write;

use xconductor::{
    load_manifest_file, parse_manifest, CatalogError, ConflictClass, ErrorPolicy, HandlerMap,
    ManifestFormat, OrchestratorConfig, Priority, RunStatus, SequenceCatalog, TimingMode,
};

use super::helpers::{orchestrator, CallLog};

const DROP_JSON: &str = r#"{
    "id": "drop-symphony",
    "name": "Drop Symphony",
    "resources": [{"id": "canvas"}],
    "movements": [{
        "name": "drop",
        "beats": [
            {"stepNumber": 2, "eventName": "commit"},
            {"stepNumber": 1, "eventName": "validate"},
            {"stepNumber": 3, "eventName": "notify", "errorPolicy": "continue",
             "timing": {"mode": "delayed", "delay_ms": 0}}
        ]
    }]
}"#;

fn manifest_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_json_manifest() {
    let file = manifest_file(".json", DROP_JSON);
    let defs = load_manifest_file(file.path()).unwrap();
    assert_eq!(defs.len(), 1);

    let def = &defs[0];
    let events: Vec<&str> = def.movements[0]
        .beats
        .iter()
        .map(|b| b.event_name.as_str())
        .collect();
    assert_eq!(events, vec!["validate", "commit", "notify"]);
    assert_eq!(def.resources[0].class, ConflictClass::Timing);
    assert_eq!(def.movements[0].beats[2].error_policy, ErrorPolicy::Continue);
    assert_eq!(
        def.movements[0].beats[2].timing,
        TimingMode::Delayed { delay_ms: 0 }
    );
}

#[cfg(feature = "manifest-yaml")]
#[test]
fn test_load_yaml_manifest() {
    let yaml = r#"
sequences:
  - id: approve
    movements:
      - name: review
        beats:
          - step: 1
            event: request
          - step: 2
            event: approved
            timing:
              mode: wait_for_signal
              signal: approve
              timeout_ms: 1000
    resources:
      - id: settings.json
        class: hard_access
  - id: empty
"#;
    let file = manifest_file(".yml", yaml);
    let defs = load_manifest_file(file.path()).unwrap();
    assert_eq!(defs.len(), 2);
    assert_eq!(defs[0].resources[0].class, ConflictClass::HardAccess);
    assert_eq!(
        defs[0].movements[0].beats[1].timing,
        TimingMode::WaitForSignal {
            signal: "approve".into(),
            timeout_ms: Some(1000),
        }
    );
    assert_eq!(defs[1].name, "empty");
}

#[cfg(feature = "manifest-toml")]
#[test]
fn test_load_toml_manifest() {
    let toml = r#"
[[sequences]]
id = "tick"

[[sequences.movements]]
name = "only"

[[sequences.movements.beats]]
step_number = 1
event_name = "tick"
handler_name = "clock"
dynamics = 3
"#;
    let file = manifest_file(".toml", toml);
    let defs = load_manifest_file(file.path()).unwrap();
    let beat = &defs[0].movements[0].beats[0];
    assert_eq!(beat.handler_key(), "clock");
    assert_eq!(beat.dynamics, 3);
}

#[test]
fn test_manifest_errors() {
    let unknown = manifest_file(".ini", "id = x");
    assert!(matches!(
        load_manifest_file(unknown.path()),
        Err(CatalogError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        load_manifest_file("/definitely/not/here.json"),
        Err(CatalogError::Io(_))
    ));
    assert!(matches!(
        parse_manifest("42", ManifestFormat::Json),
        Err(CatalogError::Parse(_))
    ));
    assert!(matches!(
        parse_manifest(r#"{"sequences": "nope"}"#, ManifestFormat::Json),
        Err(CatalogError::Parse(_))
    ));
}

#[tokio::test]
async fn test_manifest_sequence_runs_with_mounted_handlers() {
    let (orch, _) = orchestrator();
    let log = CallLog::new();
    let def = parse_manifest(DROP_JSON, ManifestFormat::Json)
        .unwrap()
        .remove(0);

    let mut handlers = HandlerMap::new();
    handlers.insert("validate".to_string(), log.handler(json!({"valid": true})));
    handlers.insert("commit".to_string(), log.handler(json!({"committed": true})));
    handlers.insert("notify".to_string(), log.failing("no listeners"));
    assert!(orch.mount(def, handlers, "manifest").success);

    let submitted = orch.submit("drop-symphony", json!({"x": 10, "y": 20}), Priority::Normal);
    let result = orch.wait(&submitted.request_id).await.unwrap();
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(log.events(), vec!["validate", "commit", "notify"]);
    assert_eq!(result.errors.len(), 1);
    assert!(orch.resolver().ledger().ownership("canvas").is_none());
}

#[test]
fn test_catalog_lists_registered_ids() {
    let catalog = SequenceCatalog::new();
    for def in parse_manifest(
        r#"[{"id": "b"}, {"id": "a"}, {"id": "c"}]"#,
        ManifestFormat::Json,
    )
    .unwrap()
    {
        catalog.register(def).unwrap();
    }
    let ids = catalog.list_ids();
    assert_eq!(ids.len(), 3);
    assert!(ids.iter().any(|id| id == "a"));
    // The snapshot can be walked twice.
    assert_eq!(ids.iter().count(), ids.iter().count());
}

#[test]
fn test_config_from_json_document() {
    let config = OrchestratorConfig::parse(
        r#"{
            "dedup": {"fingerprint_ttl_ms": 500, "reentrancy_keys": ["depth"]},
            "queue": {"max_pending": 8},
            "resource_retry_ms": 5
        }"#,
        ManifestFormat::Json,
    )
    .unwrap();
    assert_eq!(config.dedup.fingerprint_ttl_ms, Some(500));
    assert_eq!(config.dedup.reentrancy_keys, vec!["depth".to_string()]);
    assert_eq!(config.dedup.heuristic_window_ms, 10);
    assert_eq!(config.queue.max_pending, Some(8));
    assert_eq!(config.history_capacity, 100);
}
