//! Resource contention: lease-based ownership and conflict decisions.
//!
//! [`ResourceLedger`] is the single source of truth for who owns what; every
//! mutation goes through [`ConflictResolver::acquire`] and
//! [`ConflictResolver::release`].

pub mod conflict;
pub mod ledger;

pub use conflict::{ConflictResolver, Decision};
pub use ledger::{ResourceLedger, ResourceOwnership};
