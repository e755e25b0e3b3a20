//! Plugin system for contributing sequences and beat handlers at runtime.
//!
//! A plugin either calls [`PluginHost::mount`] directly with a sequence and a
//! handler map, or implements [`Plugin`] and is installed through
//! [`PluginHost::install`], which collects its contributions in a
//! [`PluginContext`] and mounts them in one go. Several plugins may contribute
//! to the same sequence id; their movements and handlers are merged, and
//! unmounting a plugin takes back exactly what it added.

pub mod context;
pub mod error;
pub mod registry;
pub mod traits;

pub use context::{HandlerMap, PluginContext};
pub use error::PluginError;
pub use registry::{MountResult, PluginHost};
pub use traits::{Plugin, PluginMetadata};
