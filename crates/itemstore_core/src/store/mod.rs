//! Record store façade and live-query plumbing.
//!
//! # Responsibility
//! - Expose the three fixed operations (`fetch_all`, `insert`, `delete`).
//! - Push full-table snapshots to subscribers after committed writes.
//!
//! # Invariants
//! - One `ItemStore` owns its connection; writes are serialized through it.
//! - Subscriber delivery never blocks a writer.

pub mod config;
pub mod item_store;
pub mod watch;
