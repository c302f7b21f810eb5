//! Repository layer over SQLite storage.
//!
//! # Responsibility
//! - Define the persistence contract record services depend on.
//! - Keep SQL details out of the model and validation layers.
//!
//! # Invariants
//! - Every write runs `Record::validate()` first and refuses on errors.
//! - Every read goes through `Record::from_storage`, which runs the type's
//!   post-load callbacks.

pub mod record_repo;
