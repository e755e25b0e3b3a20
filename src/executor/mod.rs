//! Runs one request through its sequence, beat by beat.
//!
//! Movements run in definition order and beats in step order. Each beat first
//! passes its timing gate, then is dispatched and awaited before the next one
//! starts. The baton threads through: every beat sees the payload merged with
//! the outcomes of the beats before it.

mod timing;

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::core::{CancelSignal, EventPublisher, OrchestrationEvent, SignalBoard};
use crate::dispatch::{BeatContext, HandlerDispatch};
use crate::domain::execution::{
    BeatError, CompletedBeat, ExecutionContext, ExecutionResult, RunStatus,
};
use crate::domain::model::{
    BeatDefinition, ErrorPolicy, MovementDefinition, RunRequest, SequenceDefinition,
};
use crate::error::{ErrorCode, ErrorContext, ErrorSeverity, HandlerError, OrchestrationError};
use crate::stats::StatisticsSink;

use timing::{await_timing, until, GateOutcome};

enum BeatOutcome {
    Completed,
    Failed(HandlerError),
    Cancelled,
    TimedOut,
}

pub struct Executor {
    dispatch: Arc<dyn HandlerDispatch>,
    publisher: Arc<dyn EventPublisher>,
    signals: Arc<SignalBoard>,
    stats: Arc<dyn StatisticsSink>,
    run_timeout: Option<Duration>,
}

impl Executor {
    pub fn new(
        dispatch: Arc<dyn HandlerDispatch>,
        publisher: Arc<dyn EventPublisher>,
        signals: Arc<SignalBoard>,
        stats: Arc<dyn StatisticsSink>,
    ) -> Self {
        Self {
            dispatch,
            publisher,
            signals,
            stats,
            run_timeout: None,
        }
    }

    /// Fail runs that take longer than `timeout`.
    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Run `request` to a terminal state. Never returns an error: beat
    /// failures, cancellation and timeouts all end up in the result.
    pub async fn run(
        &self,
        request: &RunRequest,
        definition: &SequenceDefinition,
        cancel: &CancelSignal,
    ) -> ExecutionResult {
        let mut ctx = ExecutionContext::new(
            &request.request_id,
            &request.sequence_id,
            &request.payload,
        );
        let deadline = self.run_timeout.map(|timeout| Instant::now() + timeout);

        for (movement_index, movement) in definition.movements.iter().enumerate() {
            ctx.current_movement_index = movement_index;
            for (beat_index, beat) in movement.beats.iter().enumerate() {
                ctx.current_beat_index = beat_index;

                if cancel.is_triggered() {
                    return self.cancelled(ctx, movement, beat, cancel);
                }

                match self
                    .run_beat(&mut ctx, request, movement, beat, cancel, deadline)
                    .await
                {
                    BeatOutcome::Completed => {}
                    BeatOutcome::Failed(_) if beat.error_policy == ErrorPolicy::Continue => {}
                    BeatOutcome::Failed(error) => {
                        let failure = OrchestrationError::BeatExecutionFailed {
                            event: beat.event_name.clone(),
                            step: beat.step_number,
                            message: error.to_string(),
                        }
                        .to_string();
                        tracing::error!(
                            request_id = %request.request_id,
                            sequence_id = %request.sequence_id,
                            event = %beat.event_name,
                            step = beat.step_number,
                            "run aborted by beat failure"
                        );
                        return ExecutionResult::from_context(ctx, RunStatus::Failed, Some(failure));
                    }
                    BeatOutcome::Cancelled => return self.cancelled(ctx, movement, beat, cancel),
                    BeatOutcome::TimedOut => return self.timed_out(ctx, movement, beat),
                }
            }
        }

        ExecutionResult::from_context(ctx, RunStatus::Completed, None)
    }

    async fn run_beat(
        &self,
        ctx: &mut ExecutionContext,
        request: &RunRequest,
        movement: &MovementDefinition,
        beat: &BeatDefinition,
        cancel: &CancelSignal,
        deadline: Option<Instant>,
    ) -> BeatOutcome {
        match await_timing(&beat.timing, ctx, &self.signals, cancel, deadline).await {
            GateOutcome::Ready => {}
            GateOutcome::Failed(error) => {
                self.record_failure(ctx, movement, beat, &error);
                return BeatOutcome::Failed(error);
            }
            GateOutcome::Cancelled => return BeatOutcome::Cancelled,
            GateOutcome::DeadlineReached => return BeatOutcome::TimedOut,
        }

        self.publisher.publish(OrchestrationEvent::BeatStarted {
            request_id: ctx.request_id.clone(),
            sequence_id: ctx.sequence_id.clone(),
            movement: movement.name.clone(),
            step_number: beat.step_number,
            event_name: beat.event_name.clone(),
            dynamics: beat.dynamics,
            timestamp: Utc::now(),
        });

        let context = BeatContext {
            request_id: ctx.request_id.clone(),
            sequence_id: ctx.sequence_id.clone(),
            movement: movement.name.clone(),
            step_number: beat.step_number,
            event_name: beat.event_name.clone(),
            handler_name: beat.handler_key().to_string(),
            priority: request.priority,
        };
        let started = Instant::now();
        let invoked = tokio::select! {
            outcome = self.dispatch.invoke(&beat.event_name, ctx.baton_snapshot(), &context) => Some(outcome),
            _ = until(deadline) => None,
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match invoked {
            None => BeatOutcome::TimedOut,
            Some(Ok(outcome)) => {
                ctx.absorb(&beat.event_name, outcome);
                ctx.completed_beats.push(CompletedBeat {
                    movement: movement.name.clone(),
                    step_number: beat.step_number,
                    event_name: beat.event_name.clone(),
                    duration_ms,
                });
                self.stats.beat(true);
                tracing::debug!(
                    request_id = %ctx.request_id,
                    event = %beat.event_name,
                    step = beat.step_number,
                    duration_ms,
                    "beat completed"
                );
                self.publisher.publish(OrchestrationEvent::BeatCompleted {
                    request_id: ctx.request_id.clone(),
                    sequence_id: ctx.sequence_id.clone(),
                    movement: movement.name.clone(),
                    step_number: beat.step_number,
                    event_name: beat.event_name.clone(),
                    duration_ms,
                    timestamp: Utc::now(),
                });
                BeatOutcome::Completed
            }
            Some(Err(error)) => {
                self.record_failure(ctx, movement, beat, &error);
                BeatOutcome::Failed(error)
            }
        }
    }

    fn record_failure(
        &self,
        ctx: &mut ExecutionContext,
        movement: &MovementDefinition,
        beat: &BeatDefinition,
        error: &HandlerError,
    ) {
        let severity = match beat.error_policy {
            ErrorPolicy::Continue => ErrorSeverity::Warning,
            ErrorPolicy::Abort => ErrorSeverity::Error,
        };
        tracing::warn!(
            request_id = %ctx.request_id,
            event = %beat.event_name,
            step = beat.step_number,
            policy = ?beat.error_policy,
            error = %error,
            "beat failed"
        );
        ctx.errors.push(BeatError {
            movement: movement.name.clone(),
            step_number: beat.step_number,
            event_name: beat.event_name.clone(),
            error: ErrorContext::new(error.code(), severity, error.to_string())
                .with_metadata(json!({ "handler": beat.handler_key() })),
        });
        self.stats.beat(false);
        self.publisher.publish(OrchestrationEvent::BeatFailed {
            request_id: ctx.request_id.clone(),
            sequence_id: ctx.sequence_id.clone(),
            movement: movement.name.clone(),
            step_number: beat.step_number,
            event_name: beat.event_name.clone(),
            error: error.to_string(),
            policy: beat.error_policy,
            timestamp: Utc::now(),
        });
    }

    fn cancelled(
        &self,
        mut ctx: ExecutionContext,
        movement: &MovementDefinition,
        beat: &BeatDefinition,
        cancel: &CancelSignal,
    ) -> ExecutionResult {
        let reason = cancel
            .reason()
            .unwrap_or_else(|| "cancelled".to_string());
        ctx.errors.push(BeatError {
            movement: movement.name.clone(),
            step_number: beat.step_number,
            event_name: beat.event_name.clone(),
            error: ErrorContext::new(ErrorCode::RunCancelled, ErrorSeverity::Error, reason.clone()),
        });
        ExecutionResult::from_context(ctx, RunStatus::Cancelled, Some(reason))
    }

    fn timed_out(
        &self,
        mut ctx: ExecutionContext,
        movement: &MovementDefinition,
        beat: &BeatDefinition,
    ) -> ExecutionResult {
        let timeout_ms = self
            .run_timeout
            .map(|t| t.as_millis() as u64)
            .unwrap_or_default();
        let message = OrchestrationError::RunTimedOut { timeout_ms }.to_string();
        tracing::error!(
            request_id = %ctx.request_id,
            event = %beat.event_name,
            timeout_ms,
            "run timed out"
        );
        ctx.errors.push(BeatError {
            movement: movement.name.clone(),
            step_number: beat.step_number,
            event_name: beat.event_name.clone(),
            error: ErrorContext::new(ErrorCode::Timeout, ErrorSeverity::Error, message.clone()),
        });
        ExecutionResult::from_context(ctx, RunStatus::Failed, Some(message))
    }
}
