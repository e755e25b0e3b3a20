//! Protocol-stable model types shared across layers.

mod priority;
mod request;
mod sequence;

pub use priority::Priority;
pub use request::RunRequest;
pub use sequence::{
    BeatDefinition, ConflictClass, ErrorPolicy, MovementDefinition, ResourceRequirement,
    SequenceDefinition, TimingMode,
};
