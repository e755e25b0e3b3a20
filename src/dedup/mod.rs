//! Duplicate-submission detection.
//!
//! A fingerprint is a SHA-256 digest over the sequence id, the canonical form
//! of the payload and the priority. The [`DeduplicationIndex`] remembers the
//! fingerprints it admitted and rejects identical submissions until the
//! fingerprint is released, expires or the index is reset.

pub mod fingerprint;
pub mod index;

pub use fingerprint::{canonicalize, compute_fingerprint, stable_stringify, Fingerprint};
pub use index::{DedupOutcome, DeduplicationIndex, DuplicateReason};
