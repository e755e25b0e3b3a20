//! Gates a beat must pass before it is dispatched.

use std::time::Duration;
use tokio::time::Instant;

use crate::core::{CancelSignal, SignalBoard, SignalWait};
use crate::domain::execution::ExecutionContext;
use crate::domain::model::TimingMode;
use crate::error::HandlerError;

/// Why a beat could not be dispatched.
#[derive(Debug)]
pub(crate) enum GateOutcome {
    Ready,
    /// Counts as a beat failure and goes through the error policy.
    Failed(HandlerError),
    Cancelled,
    DeadlineReached,
}

/// Sleep until `deadline`, or forever when there is none.
pub(crate) async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

async fn optional_sleep(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending::<()>().await,
    }
}

pub(crate) async fn await_timing(
    timing: &TimingMode,
    context: &ExecutionContext,
    signals: &SignalBoard,
    cancel: &CancelSignal,
    deadline: Option<Instant>,
) -> GateOutcome {
    match timing {
        TimingMode::Immediate => GateOutcome::Ready,
        TimingMode::AfterDependency { dependency } => {
            if context.has_completed(dependency) {
                GateOutcome::Ready
            } else {
                GateOutcome::Failed(HandlerError::DependencyNotSatisfied(format!(
                    "'{}' has not completed in this run",
                    dependency
                )))
            }
        }
        TimingMode::Delayed { delay_ms } => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(*delay_ms)) => GateOutcome::Ready,
                _ = cancel.cancelled() => GateOutcome::Cancelled,
                _ = until(deadline) => GateOutcome::DeadlineReached,
            }
        }
        TimingMode::WaitForSignal { signal, timeout_ms } => {
            tracing::debug!(
                request_id = %context.request_id,
                signal = %signal,
                "waiting for signal"
            );
            tokio::select! {
                waited = signals.wait(signal, cancel) => match waited {
                    SignalWait::Received => GateOutcome::Ready,
                    SignalWait::Cancelled => GateOutcome::Cancelled,
                },
                _ = optional_sleep(timeout_ms.map(Duration::from_millis)) => {
                    GateOutcome::Failed(HandlerError::failed(format!(
                        "signal '{}' not raised within {}ms",
                        signal,
                        timeout_ms.unwrap_or_default()
                    )))
                }
                _ = until(deadline) => GateOutcome::DeadlineReached,
            }
        }
    }
}
