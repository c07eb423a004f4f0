//! Durable local storage for `Item` records with a live full-table query.
//!
//! The crate is layered bottom-up: `model` (record and schema description),
//! `db` (SQLite bootstrap and schema checks), `repo` (fixed SQL operations)
//! and `store` (the thread-safe façade with subscriber fan-out).

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use db::{DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::item::{Item, ItemId, ItemValidationError, NewItem};
pub use model::schema::{ColumnKind, ColumnSpec, EntitySchema, ITEM_SCHEMA, SCHEMA_VERSION};
pub use repo::item_repo::{
    ConflictPolicy, ErrorKind, ItemRepository, MissingRowPolicy, RepoError, RepoResult,
    SqliteItemRepository,
};
pub use store::config::StoreConfig;
pub use store::item_store::ItemStore;
pub use store::watch::{ItemSnapshot, ItemStream, SnapshotResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
