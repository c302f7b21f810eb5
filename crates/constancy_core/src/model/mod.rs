//! Host record model.
//!
//! # Responsibility
//! - Define typed attribute values, record type definitions and instances.
//! - Expose the collaborator surface the constancy rule builds on: ordered
//!   post-load callbacks, coerced attribute reads, type-level configuration.
//!
//! # Invariants
//! - Record types are immutable once built and shared via `Arc`.
//! - Per-instance state (values, snapshot, errors) is never shared.

pub mod record;
pub mod schema;
pub mod value;
