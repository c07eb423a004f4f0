//! Single-writer guard for store files.
//!
//! # Invariants
//! - At most one `StoreLock` exists per database path across processes.
//! - The lock is released when the guard is dropped.

use super::{DbError, DbResult};
use fs2::FileExt;
use log::warn;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_SUFFIX: &str = ".lock";

/// Exclusive advisory lock held beside a database file.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    _file: File,
}

impl StoreLock {
    /// Acquires the writer lock for `db_path` without blocking.
    ///
    /// # Errors
    /// - `DbError::StoreLocked` when another holder owns the lock.
    /// - `DbError::Io` when the lock file cannot be created.
    pub fn acquire(db_path: &Path) -> DbResult<Self> {
        let path = lock_path(db_path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            warn!(
                "event=store_lock module=db status=error error_code=store_locked path={}",
                db_path.display()
            );
            return Err(DbError::StoreLocked(db_path.to_path_buf()));
        }

        Ok(Self { path, _file: file })
    }

    /// Path of the lock file itself.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_path(db_path: &Path) -> PathBuf {
    let mut raw = OsString::from(db_path.as_os_str());
    raw.push(LOCK_SUFFIX);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::{lock_path, StoreLock};
    use crate::db::DbError;
    use std::path::Path;

    #[test]
    fn lock_path_appends_suffix() {
        assert_eq!(
            lock_path(Path::new("/data/items.db")),
            Path::new("/data/items.db.lock")
        );
    }

    #[test]
    fn second_acquire_fails_until_first_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("items.db");

        let first = StoreLock::acquire(&db_path).unwrap();
        let err = StoreLock::acquire(&db_path).unwrap_err();
        assert!(matches!(err, DbError::StoreLocked(ref path) if path == &db_path));

        drop(first);
        StoreLock::acquire(&db_path).unwrap();
    }
}
