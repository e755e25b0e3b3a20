use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::{Inner, Orchestrator, RunEntry};
use crate::core::OrchestrationEvent;
use crate::dedup::DuplicateReason;
use crate::domain::model::{Priority, ResourceRequirement, RunRequest};
use crate::error::{ErrorCode, OrchestrationError};
use crate::resource::Decision;
use crate::stats::AdmissionOutcome;

/// A sequence submission with its optional extras.
#[derive(Debug, Clone)]
pub struct Submission {
    pub sequence_id: String,
    pub payload: Value,
    pub priority: Priority,
    /// Claims added on top of the ones the sequence declares.
    pub resources: Vec<ResourceRequirement>,
}

impl Submission {
    pub fn new(sequence_id: impl Into<String>, payload: Value) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            payload,
            priority: Priority::Normal,
            resources: Vec::new(),
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn resource(mut self, requirement: ResourceRequirement) -> Self {
        self.resources.push(requirement);
        self
    }
}

/// What admission decided. Never an error: rejections carry a reason and a
/// code instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionResult {
    pub request_id: String,
    pub accepted: bool,
    pub is_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl SubmissionResult {
    fn accepted(request_id: String) -> Self {
        Self {
            request_id,
            accepted: true,
            is_duplicate: false,
            reason: None,
            code: None,
        }
    }

    fn duplicate(request_id: String, reason: String) -> Self {
        Self {
            request_id,
            accepted: false,
            is_duplicate: true,
            reason: Some(reason),
            code: None,
        }
    }

    fn rejected(request_id: String, code: ErrorCode, reason: String) -> Self {
        Self {
            request_id,
            accepted: false,
            is_duplicate: false,
            reason: Some(reason),
            code: Some(code),
        }
    }
}

/// Result of trying to own every resource a request claims.
pub(super) enum Claim {
    Granted,
    Rejected { resource_id: String, owner: String },
    Busy { resource_id: String, retry_after_ms: u64 },
}

fn describe(reason: &DuplicateReason) -> String {
    match reason {
        DuplicateReason::ExactMatch => "duplicate submission".to_string(),
        DuplicateReason::ReentrantInvocation { marker } => {
            format!("re-entrant invocation ({})", marker)
        }
        DuplicateReason::RapidReinvocation { elapsed_ms } => {
            format!("repeated within {}ms", elapsed_ms)
        }
    }
}

impl Orchestrator {
    /// Submit `payload` to `sequence_id`. Returns once the request is queued
    /// or refused; execution happens on the drain task.
    pub fn submit(&self, sequence_id: &str, payload: Value, priority: Priority) -> SubmissionResult {
        self.submit_with(Submission::new(sequence_id, payload).priority(priority))
    }

    pub fn submit_with(&self, submission: Submission) -> SubmissionResult {
        self.inner.admit(submission)
    }
}

impl Inner {
    pub(super) fn admit(self: &Arc<Self>, submission: Submission) -> SubmissionResult {
        let request_id = self.runtime.next_id();
        let Submission {
            sequence_id,
            payload,
            priority,
            resources: extra,
        } = submission;

        let definition = match self.catalog.get(&sequence_id) {
            Ok(definition) => definition,
            Err(err) => return self.reject(request_id, &sequence_id, err.code(), err.to_string()),
        };

        let outcome = self.dedup.check_and_record(&sequence_id, &payload, priority);
        if !outcome.admitted {
            let reason = outcome
                .reason
                .as_ref()
                .map(describe)
                .unwrap_or_else(|| "duplicate submission".to_string());
            tracing::debug!(
                sequence_id = %sequence_id,
                fingerprint = %outcome.fingerprint.short(),
                reason = %reason,
                "duplicate submission"
            );
            self.stats.submission(AdmissionOutcome::Duplicate);
            self.publisher.publish(OrchestrationEvent::DuplicateSubmission {
                sequence_id,
                fingerprint: outcome.fingerprint.to_string(),
                timestamp: Utc::now(),
            });
            return SubmissionResult::duplicate(request_id, reason);
        }

        let mut resources = definition.resources.clone();
        for requirement in extra {
            if !resources.iter().any(|r| r.id == requirement.id) {
                resources.push(requirement);
            }
        }
        let request = RunRequest {
            request_id,
            sequence_id,
            payload,
            priority,
            submitted_at: Utc::now(),
            fingerprint: outcome.fingerprint.into(),
            resources,
        };

        for requirement in &request.resources {
            self.resolver.classify(&requirement.id, requirement.class);
        }
        match self.claim_resources(&request) {
            Claim::Granted => {}
            Claim::Busy {
                resource_id,
                retry_after_ms,
            } => {
                tracing::debug!(
                    request_id = %request.request_id,
                    resource_id = %resource_id,
                    retry_after_ms,
                    "resource busy, request will wait in queue"
                );
            }
            Claim::Rejected { resource_id, owner } => {
                self.dedup.forget(&request.fingerprint);
                let err = OrchestrationError::ResourceConflictRejected { resource_id, owner };
                return self.reject(
                    request.request_id,
                    &request.sequence_id,
                    err.code(),
                    err.to_string(),
                );
            }
        }

        self.enqueue(request)
    }

    /// Try to own every claimed resource. All or nothing: on any refusal the
    /// request gives back whatever it holds.
    pub(super) fn claim_resources(&self, request: &RunRequest) -> Claim {
        for requirement in &request.resources {
            let decision =
                self.resolver
                    .acquire(&requirement.id, &request.request_id, request.priority);
            match decision {
                Decision::Allow => {}
                Decision::Reject { owner } => {
                    self.resolver.release_all(&request.request_id);
                    return Claim::Rejected {
                        resource_id: requirement.id.clone(),
                        owner,
                    };
                }
                Decision::Queue { retry_after_ms, .. } => {
                    self.resolver.release_all(&request.request_id);
                    return Claim::Busy {
                        resource_id: requirement.id.clone(),
                        retry_after_ms,
                    };
                }
            }
        }
        Claim::Granted
    }

    fn enqueue(self: &Arc<Self>, request: RunRequest) -> SubmissionResult {
        let request_id = request.request_id.clone();
        let sequence_id = request.sequence_id.clone();
        let priority = request.priority;

        let refused = {
            let mut state = self.state.lock();
            match state.queue.push(request) {
                Ok(queue_depth) => {
                    state.runs.insert(request_id.clone(), RunEntry::queued());
                    self.refresh_idle(&state);
                    self.publisher.publish(OrchestrationEvent::SequenceQueued {
                        request_id: request_id.clone(),
                        sequence_id: sequence_id.clone(),
                        priority,
                        queue_depth,
                        timestamp: Utc::now(),
                    });
                    tracing::info!(
                        request_id = %request_id,
                        sequence_id = %sequence_id,
                        priority = %priority,
                        queue_depth,
                        "sequence queued"
                    );
                    None
                }
                Err(request) => Some(request),
            }
        };

        if let Some(request) = refused {
            self.resolver.release_all(&request.request_id);
            self.dedup.forget(&request.fingerprint);
            return self.reject(
                request.request_id,
                &request.sequence_id,
                ErrorCode::QueueFull,
                "queue_full".to_string(),
            );
        }

        self.stats.submission(AdmissionOutcome::Accepted);
        self.ensure_draining();
        SubmissionResult::accepted(request_id)
    }

    fn reject(
        &self,
        request_id: String,
        sequence_id: &str,
        code: ErrorCode,
        reason: String,
    ) -> SubmissionResult {
        tracing::warn!(
            request_id = %request_id,
            sequence_id = %sequence_id,
            reason = %reason,
            "submission rejected"
        );
        self.stats.submission(AdmissionOutcome::Rejected);
        self.publisher.publish(OrchestrationEvent::SubmissionRejected {
            sequence_id: sequence_id.to_string(),
            reason: reason.clone(),
            timestamp: Utc::now(),
        });
        SubmissionResult::rejected(request_id, code, reason)
    }
}
