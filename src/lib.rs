//! # xconductor: single-flight sequence orchestration
//!
//! `xconductor` accepts named units of work ("sequences"), serializes their
//! execution against one active-execution slot, resolves conflicts over
//! shared abstract resources, drops duplicate submissions and dispatches
//! ordered steps ("beats") to plugin-registered handlers while threading an
//! accumulating payload (the baton) between them.
//!
//! - **Admission**: sequence lookup, SHA-256 fingerprint deduplication,
//!   lease-based resource claims and a bounded priority queue
//!   (`High` > `Normal` > `Chained`, FIFO within a tier).
//! - **Execution**: movements in order, beats in step order, one at a time.
//!   Timing gates (`immediate`, `after_dependency`, `delayed`,
//!   `wait_for_signal`) and per-beat `continue` / `abort` error policies.
//! - **Plugins**: mount sequences with handler maps; handlers registered by
//!   several plugins for one beat fan out and run strictly in sequence.
//! - **Observability**: lifecycle events through an [`EventPublisher`],
//!   counters through a [`StatisticsSink`], a bounded execution history.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use xconductor::{
//!     handler_fn, BeatDefinition, HandlerMap, MovementDefinition, Orchestrator, Priority,
//!     SequenceDefinition,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let orchestrator = Orchestrator::builder().build();
//!     let sequence = SequenceDefinition::new("greet", "Greet").movement(
//!         MovementDefinition::new("main", vec![BeatDefinition::new(1, "hello")]),
//!     );
//!     let mut handlers = HandlerMap::new();
//!     handlers.insert(
//!         "hello".to_string(),
//!         handler_fn(|payload, _ctx| async move { Ok(json!({ "greeted": payload["name"] })) }),
//!     );
//!     orchestrator.mount(sequence, handlers, "greeter");
//!
//!     let submitted = orchestrator.submit("greet", json!({"name": "ada"}), Priority::Normal);
//!     let result = orchestrator.wait(&submitted.request_id).await.unwrap();
//!     println!("{:?}", result.status);
//! }
//! ```
//!
//! # Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `manifest-yaml` | YAML manifests and config (via `serde-saphyr`) |
//! | `manifest-toml` | TOML manifests and config (via `toml`) |

pub mod catalog;
pub mod config;
pub mod core;
pub mod dedup;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod plugin_system;
pub mod queue;
pub mod resource;
pub mod stats;

pub use crate::catalog::{
    load_manifest_file, parse_manifest, ManifestFormat, RegisterMode, SequenceCatalog,
};
pub use crate::config::{DedupConfig, LeasePolicy, OrchestratorConfig, QueueConfig};
pub use crate::core::{
    create_event_channel, CancelSignal, ChannelPublisher, EventPublisher, EventReceiver,
    FakeIdGenerator, FakeTimeProvider, IdGenerator, NoopPublisher, OrchestrationEvent,
    RealIdGenerator, RealTimeProvider, RecordingPublisher, RuntimeContext, SignalBoard,
    TimeProvider,
};
pub use crate::dedup::{compute_fingerprint, DeduplicationIndex, Fingerprint};
pub use crate::dispatch::{
    handler_fn, BeatContext, BeatHandler, HandlerDispatch, HandlerRegistry, SerialDispatch,
};
pub use crate::domain::execution::{
    BeatError, CompletedBeat, ExecutionContext, ExecutionResult, RunStatus,
};
pub use crate::domain::model::{
    BeatDefinition, ConflictClass, ErrorPolicy, MovementDefinition, Priority,
    ResourceRequirement, RunRequest, SequenceDefinition, TimingMode,
};
pub use crate::error::{
    CatalogError, ConfigError, ErrorCode, ErrorContext, HandlerError, HandlerResult,
    OrchestrationError, OrchestrationResult,
};
pub use crate::executor::Executor;
pub use crate::orchestrator::{Orchestrator, OrchestratorBuilder, Submission, SubmissionResult};
pub use crate::plugin_system::{
    HandlerMap, MountResult, Plugin, PluginContext, PluginError, PluginHost, PluginMetadata,
};
pub use crate::queue::ExecutionQueue;
pub use crate::resource::{ConflictResolver, Decision, ResourceLedger, ResourceOwnership};
pub use crate::stats::{
    ExecutionHistory, ExecutionRecord, InMemoryStatistics, NoopStatistics, StatisticsSink,
    StatisticsSnapshot,
};
