use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::watch;

use super::{Inner, Orchestrator, State};
use crate::catalog::SequenceCatalog;
use crate::config::OrchestratorConfig;
use crate::core::{
    EventPublisher, IdGenerator, NoopPublisher, RuntimeContext, SignalBoard, TimeProvider,
};
use crate::dedup::DeduplicationIndex;
use crate::dispatch::{HandlerDispatch, HandlerRegistry, SerialDispatch};
use crate::executor::Executor;
use crate::plugin_system::PluginHost;
use crate::queue::ExecutionQueue;
use crate::resource::{ConflictResolver, ResourceLedger};
use crate::stats::{ExecutionHistory, InMemoryStatistics, StatisticsSink, TeeStatistics};

/// Assembles an [`Orchestrator`] from explicitly owned parts.
///
/// Everything has a default; the smallest useful orchestrator is
/// `Orchestrator::builder().build()`.
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    catalog: Option<Arc<SequenceCatalog>>,
    handlers: Option<Arc<HandlerRegistry>>,
    dispatch: Option<Arc<dyn HandlerDispatch>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    statistics: Option<Arc<dyn StatisticsSink>>,
    runtime: RuntimeContext,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing catalog, e.g. one preloaded from manifests.
    pub fn catalog(mut self, catalog: Arc<SequenceCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn handler_registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.handlers = Some(registry);
        self
    }

    /// Replace the registry-backed dispatch. Mounted handlers are then only
    /// reachable if `dispatch` consults the same registry.
    pub fn dispatch(mut self, dispatch: Arc<dyn HandlerDispatch>) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Extra statistics sink. Built-in counters are always kept.
    pub fn statistics(mut self, sink: Arc<dyn StatisticsSink>) -> Self {
        self.statistics = Some(sink);
        self
    }

    pub fn time_provider(mut self, provider: Arc<dyn TimeProvider>) -> Self {
        self.runtime = self.runtime.with_time_provider(provider);
        self
    }

    pub fn id_generator(mut self, generator: Arc<dyn IdGenerator>) -> Self {
        self.runtime = self.runtime.with_id_generator(generator);
        self
    }

    pub fn build(self) -> Orchestrator {
        let config = self.config;
        let catalog = self.catalog.unwrap_or_default();
        let handlers = self.handlers.unwrap_or_default();
        let dispatch: Arc<dyn HandlerDispatch> = match self.dispatch {
            Some(dispatch) => dispatch,
            None => Arc::new(SerialDispatch::new(Arc::clone(&handlers))),
        };
        let publisher: Arc<dyn EventPublisher> = match self.publisher {
            Some(publisher) => publisher,
            None => Arc::new(NoopPublisher),
        };

        let counters = Arc::new(InMemoryStatistics::new());
        let stats: Arc<dyn StatisticsSink> = match self.statistics {
            Some(extra) => {
                let own: Arc<dyn StatisticsSink> = counters.clone();
                Arc::new(TeeStatistics::new(vec![own, extra]))
            }
            None => counters.clone(),
        };

        let signals = Arc::new(SignalBoard::new());
        let executor = Executor::new(
            dispatch,
            Arc::clone(&publisher),
            Arc::clone(&signals),
            Arc::clone(&stats),
        )
        .with_run_timeout(config.run_timeout());

        let time_provider = Arc::clone(&self.runtime.time_provider);
        let dedup = DeduplicationIndex::with_time_provider(
            config.dedup.clone(),
            Arc::clone(&time_provider),
        );
        let resolver = ConflictResolver::with_time_provider(
            Arc::new(ResourceLedger::new()),
            config.leases,
            time_provider,
        );

        let state = State {
            queue: ExecutionQueue::bounded(config.queue.max_pending),
            draining: false,
            active: None,
            runs: HashMap::new(),
            finished: VecDeque::new(),
        };
        let (idle, _) = watch::channel(true);

        tracing::debug!(
            max_pending = ?config.queue.max_pending,
            run_timeout_ms = ?config.run_timeout_ms,
            "orchestrator built"
        );

        Orchestrator {
            inner: Arc::new(Inner {
                history: ExecutionHistory::with_capacity(config.history_capacity),
                plugins: PluginHost::new(Arc::clone(&catalog), handlers),
                catalog,
                dedup,
                resolver,
                executor: Arc::new(executor),
                publisher,
                stats,
                counters,
                signals,
                runtime: self.runtime,
                state: Mutex::new(state),
                idle,
                config,
            }),
        }
    }
}
