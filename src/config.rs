//! Orchestrator configuration.
//!
//! Every field has a default, so an empty document is a valid config.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::catalog::parser::{parse_document, ManifestFormat};
use crate::domain::model::Priority;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// How long a recorded fingerprint blocks resubmission. `None` keeps it
    /// until it is released or the index is reset.
    pub fingerprint_ttl_ms: Option<u64>,
    /// Window for the rapid re-invocation heuristic.
    pub heuristic_window_ms: u64,
    /// Payload keys whose positive value marks a re-entrant invocation.
    pub reentrancy_keys: Vec<String>,
    /// Payload keys carrying a construction timestamp.
    pub timestamp_keys: Vec<String>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            fingerprint_ttl_ms: None,
            heuristic_window_ms: 10,
            reentrancy_keys: vec!["_reentrancy".to_string(), "reentrancyCount".to_string()],
            timestamp_keys: vec!["timestamp".to_string(), "_timestamp".to_string()],
        }
    }
}

/// Lease length per owner priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeasePolicy {
    pub high_ms: u64,
    pub normal_ms: u64,
    pub chained_ms: u64,
}

impl Default for LeasePolicy {
    fn default() -> Self {
        Self {
            high_ms: 5_000,
            normal_ms: 30_000,
            chained_ms: 60_000,
        }
    }
}

impl LeasePolicy {
    pub fn lease_ms(&self, priority: Priority) -> u64 {
        match priority {
            Priority::High => self.high_ms,
            Priority::Normal => self.normal_ms,
            Priority::Chained => self.chained_ms,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of pending requests; unbounded when absent.
    pub max_pending: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub dedup: DedupConfig,
    pub leases: LeasePolicy,
    pub queue: QueueConfig,
    /// Back-off before the drain loop re-checks requests blocked on a lease.
    pub resource_retry_ms: u64,
    /// Upper bound on one run. Runs are unbounded when absent.
    pub run_timeout_ms: Option<u64>,
    pub history_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            dedup: DedupConfig::default(),
            leases: LeasePolicy::default(),
            queue: QueueConfig::default(),
            resource_retry_ms: 25,
            run_timeout_ms: None,
            history_capacity: 100,
        }
    }
}

impl OrchestratorConfig {
    pub fn parse(content: &str, format: ManifestFormat) -> Result<Self, ConfigError> {
        parse_document(content, format).map_err(ConfigError::Parse)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_ms.map(Duration::from_millis)
    }

    pub fn resource_retry(&self) -> Duration {
        Duration::from_millis(self.resource_retry_ms.max(1))
    }
}
