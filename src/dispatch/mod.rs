//! Handler dispatch boundary.
//!
//! The executor only sees [`HandlerDispatch`]. [`SerialDispatch`] is the
//! registry-backed implementation: it looks handlers up in a
//! [`HandlerRegistry`] and guarantees that invocations for one request never
//! overlap, even when several handlers fan out from a single beat.

pub mod handler;
pub mod registry;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{HandlerError, HandlerResult};

pub use handler::{handler_fn, BeatContext, BeatHandler};
pub use registry::HandlerRegistry;

/// Invokes the handler(s) behind a beat event.
#[async_trait]
pub trait HandlerDispatch: Send + Sync {
    async fn invoke(
        &self,
        event_name: &str,
        payload: Value,
        context: &BeatContext,
    ) -> HandlerResult<Value>;
}

/// Registry-backed dispatch with a per-request serialization chain.
pub struct SerialDispatch {
    registry: Arc<HandlerRegistry>,
    chains: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl SerialDispatch {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            chains: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Requests with an invocation in flight or waiting.
    pub fn active_chains(&self) -> usize {
        self.chains.len()
    }

    fn chain(&self, request_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.chains
            .entry(request_id.to_string())
            .or_default()
            .clone()
    }

    async fn run_handlers(&self, payload: Value, context: &BeatContext) -> HandlerResult<Value> {
        let handlers = self
            .registry
            .handlers(&context.sequence_id, &context.handler_name);
        if handlers.is_empty() {
            return Err(HandlerError::HandlerNotFound {
                sequence_id: context.sequence_id.clone(),
                handler: context.handler_name.clone(),
            });
        }

        let mut merged = Value::Null;
        for handler in handlers {
            let outcome = handler.handle(payload.clone(), context).await?;
            merge_outcome(&mut merged, outcome);
        }
        Ok(merged)
    }
}

#[async_trait]
impl HandlerDispatch for SerialDispatch {
    async fn invoke(
        &self,
        event_name: &str,
        payload: Value,
        context: &BeatContext,
    ) -> HandlerResult<Value> {
        let chain = self.chain(&context.request_id);
        let outcome = {
            let _turn = chain.lock().await;
            tracing::trace!(
                request_id = %context.request_id,
                event = %event_name,
                handler = %context.handler_name,
                "dispatching beat"
            );
            self.run_handlers(payload, context).await
        };
        drop(chain);
        // Only the map still holds the chain once nobody is waiting on it.
        self.chains
            .remove_if(&context.request_id, |_, chain| Arc::strong_count(chain) == 1);
        outcome
    }
}

/// Fold one fan-out outcome into the accumulated one. Objects merge key by
/// key; any other non-null value replaces what came before.
fn merge_outcome(merged: &mut Value, outcome: Value) {
    match (merged, outcome) {
        (_, Value::Null) => {}
        (Value::Object(acc), Value::Object(map)) => acc.extend(map),
        (slot, other) => *slot = other,
    }
}
