//! SQLite storage bootstrap and schema checks.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the item store.
//! - Create or verify the declared entity table before any row access.
//! - Guard a store file against a second concurrent writer.
//!
//! # Invariants
//! - Layout version is tracked via `PRAGMA user_version`.
//! - Callers must not read/write rows before schema preparation succeeds.
//! - A stored version different from the declared one is never migrated.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod lock;
mod open;
pub mod schema;

pub use lock::StoreLock;
pub use open::{open_db, open_db_in_memory, open_db_with_timeout, DEFAULT_BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    SchemaMismatch {
        /// Raw `PRAGMA user_version`; SQLite stores it as a signed 32-bit value.
        db_version: i64,
        expected: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    PrimaryKeyMismatch {
        table: &'static str,
        column: &'static str,
    },
    ColumnDefinitionMismatch {
        table: &'static str,
        column: &'static str,
        stored: String,
    },
    StoreLocked(PathBuf),
}

impl DbError {
    /// Returns whether this error means the stored layout is incompatible.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch { .. }
                | Self::MissingRequiredTable(_)
                | Self::MissingRequiredColumn { .. }
                | Self::PrimaryKeyMismatch { .. }
                | Self::ColumnDefinitionMismatch { .. }
        )
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::SchemaMismatch {
                db_version,
                expected,
            } => write!(
                f,
                "database schema version {db_version} does not match declared version {expected}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
            Self::PrimaryKeyMismatch { table, column } => {
                write!(f, "column `{table}.{column}` is not the stored primary key")
            }
            Self::ColumnDefinitionMismatch {
                table,
                column,
                stored,
            } => write!(
                f,
                "column `{table}.{column}` is stored as `{stored}`, which does not match its declaration"
            ),
            Self::StoreLocked(path) => {
                write!(f, "store `{}` is already open for writing", path.display())
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
