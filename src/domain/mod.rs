//! Plain data shared by every layer: what a sequence looks like, what a
//! submitted request carries and what a finished run reports.
//!
//! - [`model`]: sequence definitions, priorities and run requests.
//! - [`execution`]: run status, the in-flight context and the final result.

pub mod execution;
pub mod model;
