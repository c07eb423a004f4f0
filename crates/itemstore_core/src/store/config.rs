//! Store open options.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::repo::item_repo::{ConflictPolicy, MissingRowPolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options for `ItemStore::open`.
///
/// `path = None` opens a private in-memory database, mainly for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
    pub conflict_policy: ConflictPolicy,
    pub missing_row_policy: MissingRowPolicy,
    /// How long a write waits on a busy database file before failing.
    pub busy_timeout: Duration,
}

impl StoreConfig {
    /// File-backed store at `path` with default policies.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            ..Self::in_memory()
        }
    }

    /// In-memory store with default policies.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            conflict_policy: ConflictPolicy::default(),
            missing_row_policy: MissingRowPolicy::default(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn with_missing_row_policy(mut self, policy: MissingRowPolicy) -> Self {
        self.missing_row_policy = policy;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}
