//! Named signals released by the host and awaited by `wait_for_signal` beats.

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::Notify;

use super::cancel::CancelSignal;

/// Outcome of waiting on a named signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalWait {
    Received,
    Cancelled,
}

/// Counting signal board. A raise that happens before anyone waits is kept
/// until a waiter consumes it.
#[derive(Debug, Default)]
pub struct SignalBoard {
    pending: Mutex<HashMap<String, usize>>,
    notify: Notify,
}

impl SignalBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self, name: &str) {
        *self.pending.lock().entry(name.to_string()).or_insert(0) += 1;
        tracing::debug!(signal = %name, "signal raised");
        self.notify.notify_waiters();
    }

    pub fn pending(&self, name: &str) -> usize {
        self.pending.lock().get(name).copied().unwrap_or(0)
    }

    fn take(&self, name: &str) -> bool {
        let mut pending = self.pending.lock();
        match pending.get_mut(name) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    pending.remove(name);
                }
                true
            }
            _ => false,
        }
    }

    /// Wait until `name` is raised or `cancel` fires.
    pub async fn wait(&self, name: &str, cancel: &CancelSignal) -> SignalWait {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.take(name) {
                return SignalWait::Received;
            }
            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => return SignalWait::Cancelled,
            }
        }
    }
}
