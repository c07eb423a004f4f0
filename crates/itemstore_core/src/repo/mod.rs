//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the fixed item data-access contract.
//! - Isolate SQLite statements from the live store.
//!
//! # Invariants
//! - Repository writes enforce `Item::validate()` before persistence.
//! - Repository APIs return semantic errors (`ConstraintViolation`,
//!   `NotFound`) in addition to storage errors.

pub mod item_repo;
