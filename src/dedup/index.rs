use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::fingerprint::{
    compute_fingerprint, contains_key, find_reentrancy_marker, strip_keys, Fingerprint,
};
use crate::config::DedupConfig;
use crate::core::runtime_context::{RealTimeProvider, TimeProvider};
use crate::domain::model::Priority;

/// Why a submission was treated as a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateReason {
    /// Identical fingerprint already recorded.
    ExactMatch,
    /// The payload carries a positive re-entrancy marker.
    ReentrantInvocation { marker: String },
    /// Same payload, timestamps aside, admitted within the heuristic window.
    RapidReinvocation { elapsed_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupOutcome {
    pub admitted: bool,
    pub fingerprint: Fingerprint,
    pub reason: Option<DuplicateReason>,
}

#[derive(Default)]
struct DedupState {
    /// Admitted fingerprints and when they were recorded.
    exact: HashMap<Fingerprint, i64>,
    /// Timestamp-stripped fingerprints of recent admissions.
    recent: HashMap<Fingerprint, i64>,
}

pub struct DeduplicationIndex {
    config: DedupConfig,
    time_provider: Arc<dyn TimeProvider>,
    state: Mutex<DedupState>,
}

impl DeduplicationIndex {
    pub fn new(config: DedupConfig) -> Self {
        Self::with_time_provider(config, Arc::new(RealTimeProvider))
    }

    pub fn with_time_provider(config: DedupConfig, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            config,
            time_provider,
            state: Mutex::new(DedupState::default()),
        }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Fingerprint the submission and record it unless it is a duplicate.
    pub fn check_and_record(
        &self,
        sequence_id: &str,
        payload: &Value,
        priority: Priority,
    ) -> DedupOutcome {
        let fingerprint = compute_fingerprint(sequence_id, payload, priority);
        let now = self.time_provider.now_millis();
        let mut state = self.state.lock();
        self.purge(&mut state, now);

        let duplicate = |reason: DuplicateReason| DedupOutcome {
            admitted: false,
            fingerprint: fingerprint.clone(),
            reason: Some(reason),
        };

        if state.exact.contains_key(&fingerprint) {
            return duplicate(DuplicateReason::ExactMatch);
        }

        if let Some(marker) = find_reentrancy_marker(payload, &self.config.reentrancy_keys) {
            return duplicate(DuplicateReason::ReentrantInvocation { marker });
        }

        let relaxed = if contains_key(payload, &self.config.timestamp_keys) {
            let stripped = strip_keys(payload, &self.config.timestamp_keys);
            let relaxed = compute_fingerprint(sequence_id, &stripped, priority);
            if let Some(&recorded_at) = state.recent.get(&relaxed) {
                let elapsed_ms = now.saturating_sub(recorded_at).max(0) as u64;
                if elapsed_ms < self.config.heuristic_window_ms {
                    return duplicate(DuplicateReason::RapidReinvocation { elapsed_ms });
                }
            }
            Some(relaxed)
        } else {
            None
        };

        state.exact.insert(fingerprint.clone(), now);
        if let Some(relaxed) = relaxed {
            state.recent.insert(relaxed, now);
        }
        DedupOutcome {
            admitted: true,
            fingerprint,
            reason: None,
        }
    }

    fn purge(&self, state: &mut DedupState, now: i64) {
        if let Some(ttl) = self.config.fingerprint_ttl_ms {
            state
                .exact
                .retain(|_, recorded_at| now.saturating_sub(*recorded_at) < ttl as i64);
        }
        let window = self.config.heuristic_window_ms as i64;
        state
            .recent
            .retain(|_, recorded_at| now.saturating_sub(*recorded_at) < window);
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.state.lock().exact.contains_key(fingerprint)
    }

    /// Release a fingerprint so an identical submission is admitted again.
    pub fn forget(&self, fingerprint: &str) -> bool {
        self.state.lock().exact.remove(fingerprint).is_some()
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.exact.clear();
        state.recent.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DeduplicationIndex {
    fn default() -> Self {
        Self::new(DedupConfig::default())
    }
}
