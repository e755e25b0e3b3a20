use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::model::Priority;

/// A time-bounded ownership grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOwnership {
    pub resource_id: String,
    pub owner_request_id: String,
    pub owner_priority: Priority,
    pub acquired_at: i64,
    pub expires_at: i64,
}

impl ResourceOwnership {
    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis >= self.expires_at
    }
}

/// Ownership table keyed by resource id. At most one owner per resource.
///
/// Expiry is passive: entries are discarded when a caller looks at them
/// after their lease ran out.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    owners: Mutex<HashMap<String, ResourceOwnership>>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the slot for `resource_id` under the ledger lock. An
    /// expired entry is discarded before `f` sees the slot; whatever `f`
    /// leaves in the slot is stored back.
    pub(crate) fn update<R>(
        &self,
        resource_id: &str,
        now_millis: i64,
        f: impl FnOnce(&mut Option<ResourceOwnership>) -> R,
    ) -> R {
        let mut owners = self.owners.lock();
        let mut slot = owners.remove(resource_id);
        if let Some(entry) = slot.as_ref().filter(|entry| entry.is_expired(now_millis)) {
            tracing::debug!(
                resource_id = %resource_id,
                owner = %entry.owner_request_id,
                "lease expired"
            );
            slot = None;
        }
        let result = f(&mut slot);
        if let Some(entry) = slot {
            owners.insert(resource_id.to_string(), entry);
        }
        result
    }

    /// Current non-expired owner of `resource_id`.
    pub fn live_owner(&self, resource_id: &str, now_millis: i64) -> Option<ResourceOwnership> {
        self.update(resource_id, now_millis, |slot| slot.clone())
    }

    /// Remove ownership only when `request_id` is the recorded owner.
    pub(crate) fn release(&self, resource_id: &str, request_id: &str) -> bool {
        let mut owners = self.owners.lock();
        match owners.get(resource_id) {
            Some(entry) if entry.owner_request_id == request_id => {
                owners.remove(resource_id);
                true
            }
            _ => false,
        }
    }

    /// Release everything owned by `request_id`. Returns the released ids.
    pub(crate) fn release_all(&self, request_id: &str) -> Vec<String> {
        let mut owners = self.owners.lock();
        let released: Vec<String> = owners
            .iter()
            .filter(|(_, entry)| entry.owner_request_id == request_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &released {
            owners.remove(id);
        }
        released
    }

    /// Snapshot of one entry, expired or not.
    pub fn ownership(&self, resource_id: &str) -> Option<ResourceOwnership> {
        self.owners.lock().get(resource_id).cloned()
    }

    pub fn owned_by(&self, request_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .owners
            .lock()
            .values()
            .filter(|entry| entry.owner_request_id == request_id)
            .map(|entry| entry.resource_id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.owners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
