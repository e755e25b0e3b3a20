use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::domain::model::Priority;
use crate::error::HandlerResult;

/// What a handler learns about the beat it is serving.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeatContext {
    pub request_id: String,
    pub sequence_id: String,
    pub movement: String,
    pub step_number: u32,
    pub event_name: String,
    /// Registry key; the event name unless the beat names a handler.
    pub handler_name: String,
    pub priority: Priority,
}

/// A handler for one beat event.
///
/// The returned value is merged into the run's baton: object keys overwrite,
/// `null` leaves it untouched, anything else is stored under the event name.
#[async_trait]
pub trait BeatHandler: Send + Sync {
    async fn handle(&self, payload: Value, context: &BeatContext) -> HandlerResult<Value>;
}

type HandlerFn = dyn Fn(Value, BeatContext) -> BoxFuture<'static, HandlerResult<Value>> + Send + Sync;

struct FnHandler {
    f: Box<HandlerFn>,
}

#[async_trait]
impl BeatHandler for FnHandler {
    async fn handle(&self, payload: Value, context: &BeatContext) -> HandlerResult<Value> {
        (self.f)(payload, context.clone()).await
    }
}

/// Wrap an async closure as a [`BeatHandler`].
///
/// ```ignore
/// let validate = handler_fn(|payload, _ctx| async move {
///     Ok(serde_json::json!({ "valid": payload["x"].is_number() }))
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn BeatHandler>
where
    F: Fn(Value, BeatContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<Value>> + Send + 'static,
{
    Arc::new(FnHandler {
        f: Box::new(move |payload, context| Box::pin(f(payload, context))),
    })
}
