//! The admission front door and the single-flight drain loop.
//!
//! [`Orchestrator::submit`] runs the whole admission chain synchronously:
//! sequence lookup, duplicate detection, resource claims and enqueueing. A
//! background task then drains the queue one request at a time; the next
//! request is only taken after the previous run has fully settled.
//!
//! ```text
//! SUBMITTED ─► NOT_FOUND | DUPLICATE | REJECTED
//!     └──────► QUEUED ─► RUNNING ─► COMPLETED | FAILED | CANCELLED
//! ```

mod admission;
mod builder;
mod drain;

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::watch;

use crate::catalog::SequenceCatalog;
use crate::config::OrchestratorConfig;
use crate::core::{CancelSignal, EventPublisher, RuntimeContext, SignalBoard};
use crate::dedup::DeduplicationIndex;
use crate::domain::execution::{ExecutionResult, RunStatus};
use crate::domain::model::SequenceDefinition;
use crate::error::OrchestrationResult;
use crate::executor::Executor;
use crate::plugin_system::{HandlerMap, MountResult, Plugin, PluginError, PluginHost};
use crate::queue::ExecutionQueue;
use crate::resource::ConflictResolver;
use crate::stats::{ExecutionHistory, InMemoryStatistics, StatisticsSink, StatisticsSnapshot};

pub use admission::{Submission, SubmissionResult};
pub use builder::OrchestratorBuilder;

type ResultSender = watch::Sender<Option<Arc<ExecutionResult>>>;

struct RunEntry {
    status: RunStatus,
    result: ResultSender,
}

impl RunEntry {
    fn queued() -> Self {
        let (result, _) = watch::channel(None);
        Self {
            status: RunStatus::Queued,
            result,
        }
    }
}

struct ActiveRun {
    request_id: String,
    cancel: CancelSignal,
}

#[derive(Default)]
struct State {
    queue: ExecutionQueue,
    draining: bool,
    active: Option<ActiveRun>,
    runs: HashMap<String, RunEntry>,
    /// Settled request ids, oldest first; bounds `runs`.
    finished: VecDeque<String>,
}

pub(crate) struct Inner {
    config: OrchestratorConfig,
    catalog: Arc<SequenceCatalog>,
    dedup: DeduplicationIndex,
    resolver: ConflictResolver,
    plugins: PluginHost,
    executor: Arc<Executor>,
    publisher: Arc<dyn EventPublisher>,
    stats: Arc<dyn StatisticsSink>,
    counters: Arc<InMemoryStatistics>,
    history: ExecutionHistory,
    signals: Arc<SignalBoard>,
    runtime: RuntimeContext,
    state: Mutex<State>,
    idle: watch::Sender<bool>,
}

impl Inner {
    /// Idle means nothing queued, nothing running and no drain task alive.
    fn refresh_idle(&self, state: &State) {
        let idle = !state.draining && state.active.is_none() && state.queue.is_empty();
        self.idle.send_if_modified(|current| {
            let changed = *current != idle;
            *current = idle;
            changed
        });
    }
}

/// Accepts sequence submissions and runs them strictly one at a time.
///
/// Cloning is cheap; every clone drives the same queue.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn catalog(&self) -> &Arc<SequenceCatalog> {
        &self.inner.catalog
    }

    pub fn plugins(&self) -> &PluginHost {
        &self.inner.plugins
    }

    pub fn resolver(&self) -> &ConflictResolver {
        &self.inner.resolver
    }

    /// Register a sequence with no handlers attached. Fails on duplicate ids.
    pub fn register(&self, definition: SequenceDefinition) -> OrchestrationResult<Vec<String>> {
        self.inner.catalog.register(definition)
    }

    pub fn mount(
        &self,
        definition: SequenceDefinition,
        handlers: HandlerMap,
        plugin_id: &str,
    ) -> MountResult {
        self.inner.plugins.mount(definition, handlers, plugin_id)
    }

    pub fn unmount(&self, plugin_id: &str) -> bool {
        self.inner.plugins.unmount(plugin_id)
    }

    pub async fn install(&self, plugin: Box<dyn Plugin>) -> Result<Vec<MountResult>, PluginError> {
        self.inner.plugins.install(plugin).await
    }

    pub async fn uninstall(&self, plugin_id: &str) -> Result<(), PluginError> {
        self.inner.plugins.uninstall(plugin_id).await
    }

    /// Raise a named signal for `wait_for_signal` beats.
    pub fn signal(&self, name: &str) {
        self.inner.signals.raise(name);
    }

    /// Cancel a queued or running request. Returns false when the request is
    /// unknown or already settled.
    pub fn cancel(&self, request_id: &str) -> bool {
        self.inner.cancel(request_id)
    }

    /// Lifecycle state of a request; `None` when it was never accepted or
    /// has been evicted.
    pub fn status(&self, request_id: &str) -> Option<RunStatus> {
        self.inner
            .state
            .lock()
            .runs
            .get(request_id)
            .map(|entry| entry.status)
    }

    /// Wait for a request to settle and return its result.
    pub async fn wait(&self, request_id: &str) -> Option<ExecutionResult> {
        let mut rx = {
            let state = self.inner.state.lock();
            state.runs.get(request_id)?.result.subscribe()
        };
        loop {
            if let Some(result) = rx.borrow_and_update().as_ref() {
                return Some(ExecutionResult::clone(result));
            }
            if rx.changed().await.is_err() {
                return rx.borrow().as_deref().cloned();
            }
        }
    }

    /// Wait until the queue is empty and no run is active.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.idle.subscribe();
        let _ = rx.wait_for(|idle| *idle).await;
    }

    pub fn is_idle(&self) -> bool {
        *self.inner.idle.borrow()
    }

    pub fn queue_depth(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Id of the request currently holding the execution slot.
    pub fn active_request(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .active
            .as_ref()
            .map(|active| active.request_id.clone())
    }

    /// Queued request ids in drain order.
    pub fn pending(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .queue
            .iter()
            .map(|request| request.request_id.clone())
            .collect()
    }

    pub fn history(&self) -> &ExecutionHistory {
        &self.inner.history
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.inner.counters.snapshot()
    }

    /// Forget every recorded fingerprint.
    pub fn reset_dedup(&self) {
        self.inner.dedup.reset();
    }
}
