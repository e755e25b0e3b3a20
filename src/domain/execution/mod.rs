//! Execution state of a single run.

mod context;
mod result;
mod status;

pub use context::{BeatError, CompletedBeat, ExecutionContext};
pub use result::ExecutionResult;
pub use status::RunStatus;
