use chrono::Utc;
use std::sync::Arc;
use tokio::runtime::Handle;

use super::admission::Claim;
use super::{ActiveRun, Inner, State};
use crate::core::{CancelSignal, OrchestrationEvent};
use crate::domain::execution::{ExecutionResult, RunStatus};
use crate::domain::model::RunRequest;
use crate::stats::ExecutionRecord;

enum Next {
    Run(RunRequest, CancelSignal),
    /// Every queued request waits on a resource lease.
    Blocked,
    Empty,
}

impl Inner {
    /// Spawn the drain task unless one is already running.
    pub(super) fn ensure_draining(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if state.draining {
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                state.draining = true;
                handle.spawn(drain(Arc::clone(self)));
            }
            Err(_) => {
                tracing::warn!(
                    queue_depth = state.queue.len(),
                    "no tokio runtime, queued requests wait for the next submission inside one"
                );
            }
        }
    }

    /// Take the next runnable request and claim the execution slot for it,
    /// in one critical section.
    fn next_request(&self) -> Next {
        let mut state = self.state.lock();
        if state.queue.is_empty() {
            state.draining = false;
            self.refresh_idle(&state);
            return Next::Empty;
        }

        let next = state
            .queue
            .pop_first(|request| matches!(self.claim_resources(request), Claim::Granted));
        let Some(request) = next else {
            return Next::Blocked;
        };

        let cancel = CancelSignal::new();
        state.active = Some(ActiveRun {
            request_id: request.request_id.clone(),
            cancel: cancel.clone(),
        });
        if let Some(entry) = state.runs.get_mut(&request.request_id) {
            entry.status = RunStatus::Running;
        }
        Next::Run(request, cancel)
    }

    async fn run_request(&self, request: RunRequest, cancel: CancelSignal) {
        // Once started, an identical submission is a new request.
        self.dedup.forget(&request.fingerprint);
        tracing::info!(
            request_id = %request.request_id,
            sequence_id = %request.sequence_id,
            priority = %request.priority,
            "sequence started"
        );
        self.publisher.publish(OrchestrationEvent::SequenceStarted {
            request_id: request.request_id.clone(),
            sequence_id: request.sequence_id.clone(),
            timestamp: Utc::now(),
        });

        let result = match self.catalog.get(&request.sequence_id) {
            Ok(definition) => {
                let executor = Arc::clone(&self.executor);
                let task_request = request.clone();
                let task_cancel = cancel.clone();
                let handle = tokio::spawn(async move {
                    executor.run(&task_request, &definition, &task_cancel).await
                });
                match handle.await {
                    Ok(result) => result,
                    Err(err) => {
                        tracing::error!(
                            request_id = %request.request_id,
                            error = %err,
                            "run task panicked"
                        );
                        ExecutionResult::not_started(
                            &request.request_id,
                            &request.sequence_id,
                            RunStatus::Failed,
                            format!("run panicked: {}", err),
                        )
                    }
                }
            }
            // Unmounted while the request was queued.
            Err(err) => ExecutionResult::not_started(
                &request.request_id,
                &request.sequence_id,
                RunStatus::Failed,
                err.to_string(),
            ),
        };

        let mut state = self.state.lock();
        if state
            .active
            .as_ref()
            .is_some_and(|active| active.request_id == request.request_id)
        {
            state.active = None;
        }
        self.settle(&mut state, &request, result);
    }

    /// Record a terminal result: release what the request owned, report it
    /// and wake its waiters.
    fn settle(&self, state: &mut State, request: &RunRequest, result: ExecutionResult) {
        self.resolver.release_all(&request.request_id);
        self.stats.run_finished(result.status, result.duration_ms);
        self.history
            .record(ExecutionRecord::from_result(&result, request.priority));

        let failure = result.failure.clone().unwrap_or_default();
        let event = match result.status {
            RunStatus::Completed => {
                tracing::info!(
                    request_id = %result.request_id,
                    sequence_id = %result.sequence_id,
                    duration_ms = result.duration_ms,
                    errors = result.errors.len(),
                    "sequence completed"
                );
                OrchestrationEvent::SequenceCompleted {
                    request_id: result.request_id.clone(),
                    sequence_id: result.sequence_id.clone(),
                    duration_ms: result.duration_ms,
                    error_count: result.errors.len(),
                    timestamp: Utc::now(),
                }
            }
            RunStatus::Cancelled => {
                tracing::info!(
                    request_id = %result.request_id,
                    sequence_id = %result.sequence_id,
                    reason = %failure,
                    "sequence cancelled"
                );
                OrchestrationEvent::SequenceCancelled {
                    request_id: result.request_id.clone(),
                    sequence_id: result.sequence_id.clone(),
                    reason: failure,
                    timestamp: Utc::now(),
                }
            }
            RunStatus::Failed | RunStatus::Queued | RunStatus::Running => {
                tracing::warn!(
                    request_id = %result.request_id,
                    sequence_id = %result.sequence_id,
                    error = %failure,
                    "sequence failed"
                );
                OrchestrationEvent::SequenceFailed {
                    request_id: result.request_id.clone(),
                    sequence_id: result.sequence_id.clone(),
                    error: failure,
                    timestamp: Utc::now(),
                }
            }
        };
        self.publisher.publish(event);

        let status = result.status;
        if let Some(entry) = state.runs.get_mut(&request.request_id) {
            entry.status = status;
            entry.result.send_replace(Some(Arc::new(result)));
        }
        state.finished.push_back(request.request_id.clone());
        let keep = self.config.history_capacity.max(1);
        while state.finished.len() > keep {
            if let Some(evicted) = state.finished.pop_front() {
                state.runs.remove(&evicted);
            }
        }
        self.refresh_idle(state);
    }

    pub(super) fn cancel(&self, request_id: &str) -> bool {
        let mut state = self.state.lock();

        let running = state
            .active
            .as_ref()
            .filter(|active| active.request_id == request_id)
            .map(|active| active.cancel.clone());
        if let Some(cancel) = running {
            drop(state);
            cancel.trigger("cancelled by caller");
            // The run settles at its next suspension point; its resources
            // are free from now on.
            let released = self.resolver.release_all(request_id);
            tracing::info!(
                request_id = %request_id,
                released = released.len(),
                "cancelling active run"
            );
            return true;
        }

        match state.queue.remove(request_id) {
            Some(request) => {
                self.dedup.forget(&request.fingerprint);
                let result = ExecutionResult::not_started(
                    &request.request_id,
                    &request.sequence_id,
                    RunStatus::Cancelled,
                    "cancelled while queued",
                );
                self.settle(&mut state, &request, result);
                true
            }
            None => false,
        }
    }
}

async fn drain(inner: Arc<Inner>) {
    tracing::debug!("drain task started");
    loop {
        match inner.next_request() {
            Next::Run(request, cancel) => inner.run_request(request, cancel).await,
            Next::Blocked => tokio::time::sleep(inner.config.resource_retry()).await,
            Next::Empty => break,
        }
    }
    tracing::debug!("drain task idle");
}
