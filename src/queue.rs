//! Priority-tiered admission queue.
//!
//! One FIFO per priority tier. `High` drains before `Normal`, which drains
//! before `Chained`, whatever the arrival order across tiers. The queue holds
//! no lock of its own; the orchestrator keeps it inside its state mutex.

use std::collections::VecDeque;

use crate::domain::model::{Priority, RunRequest};

#[derive(Debug, Default)]
pub struct ExecutionQueue {
    tiers: [VecDeque<RunRequest>; 3],
    max_pending: Option<usize>,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue that refuses requests beyond `max_pending`, if set.
    pub fn bounded(max_pending: Option<usize>) -> Self {
        Self {
            tiers: Default::default(),
            max_pending,
        }
    }

    pub fn is_full(&self) -> bool {
        self.max_pending.is_some_and(|max| self.len() >= max)
    }

    /// Append to the tail of the request's tier. A full queue hands the
    /// request back.
    pub fn push(&mut self, request: RunRequest) -> Result<usize, RunRequest> {
        if self.is_full() {
            return Err(request);
        }
        self.tiers[request.priority.tier()].push_back(request);
        Ok(self.len())
    }

    /// Take the head of the highest non-empty tier.
    pub fn pop(&mut self) -> Option<RunRequest> {
        self.tiers.iter_mut().find_map(|tier| tier.pop_front())
    }

    /// Take the first request, in drain order, accepted by `eligible`.
    /// Requests that are passed over keep their position.
    pub fn pop_first<F>(&mut self, mut eligible: F) -> Option<RunRequest>
    where
        F: FnMut(&RunRequest) -> bool,
    {
        for tier in self.tiers.iter_mut() {
            if let Some(index) = tier.iter().position(&mut eligible) {
                return tier.remove(index);
            }
        }
        None
    }

    pub fn peek(&self) -> Option<&RunRequest> {
        self.tiers.iter().find_map(|tier| tier.front())
    }

    pub fn remove(&mut self, request_id: &str) -> Option<RunRequest> {
        for tier in self.tiers.iter_mut() {
            if let Some(index) = tier.iter().position(|r| r.request_id == request_id) {
                return tier.remove(index);
            }
        }
        None
    }

    /// Zero-based position in drain order.
    pub fn position(&self, request_id: &str) -> Option<usize> {
        self.iter().position(|r| r.request_id == request_id)
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.position(request_id).is_some()
    }

    /// Pending requests in drain order.
    pub fn iter(&self) -> impl Iterator<Item = &RunRequest> {
        self.tiers.iter().flat_map(|tier| tier.iter())
    }

    pub fn depth(&self, priority: Priority) -> usize {
        self.tiers[priority.tier()].len()
    }

    pub fn len(&self) -> usize {
        self.tiers.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.iter().all(VecDeque::is_empty)
    }

    pub fn clear(&mut self) -> Vec<RunRequest> {
        self.tiers
            .iter_mut()
            .flat_map(|tier| tier.drain(..))
            .collect()
    }
}
