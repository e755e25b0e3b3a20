use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// External cancellation signal for one run.
#[derive(Clone, Debug, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    reason: Arc<Mutex<Option<String>>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger cancellation. The first reason wins.
    pub fn trigger(&self, reason: impl Into<String>) {
        {
            let mut guard = self.reason.lock();
            if guard.is_none() {
                *guard = Some(reason.into());
            }
        }
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }
}
