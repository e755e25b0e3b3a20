//! Runtime primitives shared by the orchestrator and executor.

pub mod cancel;
pub mod event_bus;
pub mod runtime_context;
pub mod signals;

pub use cancel::CancelSignal;
pub use event_bus::{
    create_event_channel, ChannelPublisher, EventPublisher, EventReceiver, NoopPublisher,
    OrchestrationEvent, RecordingPublisher,
};
pub use runtime_context::{
    FakeIdGenerator, FakeTimeProvider, IdGenerator, RealIdGenerator, RealTimeProvider,
    RuntimeContext, TimeProvider,
};
pub use signals::{SignalBoard, SignalWait};
