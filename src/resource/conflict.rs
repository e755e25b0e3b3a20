use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::ledger::{ResourceLedger, ResourceOwnership};
use crate::config::LeasePolicy;
use crate::core::runtime_context::{RealTimeProvider, TimeProvider};
use crate::domain::model::{ConflictClass, Priority};

/// Outcome of an acquire attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    /// Hard-access conflict; the caller must give up.
    Reject { owner: String },
    /// Retry after the current owner finishes or its lease runs out.
    Queue { owner: String, retry_after_ms: u64 },
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

pub struct ConflictResolver {
    ledger: Arc<ResourceLedger>,
    leases: LeasePolicy,
    time_provider: Arc<dyn TimeProvider>,
    classes: RwLock<HashMap<String, ConflictClass>>,
}

impl ConflictResolver {
    pub fn new(ledger: Arc<ResourceLedger>, leases: LeasePolicy) -> Self {
        Self::with_time_provider(ledger, leases, Arc::new(RealTimeProvider))
    }

    pub fn with_time_provider(
        ledger: Arc<ResourceLedger>,
        leases: LeasePolicy,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            ledger,
            leases,
            time_provider,
            classes: RwLock::new(HashMap::new()),
        }
    }

    pub fn ledger(&self) -> &Arc<ResourceLedger> {
        &self.ledger
    }

    /// Classify a resource. Hard access is sticky: once a resource is known
    /// to need exclusive access it is never downgraded to timing. Timing is
    /// the default and is not stored, so only hard-access ids are kept.
    pub fn classify(&self, resource_id: &str, class: ConflictClass) {
        if class == ConflictClass::HardAccess {
            self.classes
                .write()
                .insert(resource_id.to_string(), ConflictClass::HardAccess);
        }
    }

    pub fn class_of(&self, resource_id: &str) -> ConflictClass {
        self.classes
            .read()
            .get(resource_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn acquire(&self, resource_id: &str, request_id: &str, priority: Priority) -> Decision {
        let now = self.time_provider.now_millis();
        let class = self.class_of(resource_id);
        let lease_ms = self.leases.lease_ms(priority) as i64;
        let new_lease = || ResourceOwnership {
            resource_id: resource_id.to_string(),
            owner_request_id: request_id.to_string(),
            owner_priority: priority,
            acquired_at: now,
            expires_at: now.saturating_add(lease_ms),
        };

        self.ledger.update(resource_id, now, |slot| match slot.as_ref() {
            None => {
                *slot = Some(new_lease());
                tracing::debug!(
                    resource_id = %resource_id,
                    request_id = %request_id,
                    lease_ms,
                    "resource acquired"
                );
                Decision::Allow
            }
            Some(current) if current.owner_request_id == request_id => {
                // Re-acquire keeps the original lease.
                Decision::Allow
            }
            Some(current) if class == ConflictClass::HardAccess => {
                tracing::warn!(
                    resource_id = %resource_id,
                    request_id = %request_id,
                    owner = %current.owner_request_id,
                    "hard-access conflict rejected"
                );
                Decision::Reject {
                    owner: current.owner_request_id.clone(),
                }
            }
            Some(current) if priority.preempts() => {
                tracing::warn!(
                    resource_id = %resource_id,
                    request_id = %request_id,
                    previous_owner = %current.owner_request_id,
                    "resource preempted"
                );
                *slot = Some(new_lease());
                Decision::Allow
            }
            Some(current) => Decision::Queue {
                owner: current.owner_request_id.clone(),
                retry_after_ms: current.expires_at.saturating_sub(now).max(0) as u64,
            },
        })
    }

    /// Release a resource. A caller that is not the recorded owner (for
    /// example after being preempted) is ignored.
    pub fn release(&self, resource_id: &str, request_id: &str) -> bool {
        let released = self.ledger.release(resource_id, request_id);
        if !released {
            tracing::debug!(
                resource_id = %resource_id,
                request_id = %request_id,
                "stale release ignored"
            );
        }
        released
    }

    pub fn release_all(&self, request_id: &str) -> Vec<String> {
        self.ledger.release_all(request_id)
    }
}
