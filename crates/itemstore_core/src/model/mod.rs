//! Persisted entity shapes.
//!
//! # Responsibility
//! - Define the `Item` record and its identity.
//! - Describe the on-disk table layout as an explicit schema object.
//!
//! # Invariants
//! - Schema metadata is pure data; it performs no I/O.

pub mod item;
pub mod schema;
