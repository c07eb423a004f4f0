//! Item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/delete/list-all over the `items` table.
//! - Keep SQL details inside the persistence boundary.
//! - Translate engine failures into the store error taxonomy.
//!
//! # Invariants
//! - Write paths call `Item::validate()` before SQL mutations.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - There is no update statement; rows change only by insert or delete.

use crate::db::schema::verify_schema;
use crate::db::DbError;
use crate::model::item::{Item, ItemId, ItemValidationError, NewItem};
use crate::model::schema::ITEM_SCHEMA;
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// What an insert does when the identity already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Fail with `RepoError::ConstraintViolation`.
    #[default]
    Abort,
    /// Overwrite the stored row with the new values.
    Replace,
}

/// What a delete does when no row matches the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingRowPolicy {
    /// Succeed without changes.
    #[default]
    Ignore,
    /// Fail with `RepoError::NotFound`.
    Error,
}

/// Coarse classification of store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConstraintViolation,
    NotFound,
    SchemaMismatch,
    /// Storage unreachable, corrupted, locked or otherwise failing.
    Io,
    /// Caller-supplied data rejected before reaching storage.
    InvalidInput,
}

/// Repository error for item persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    Db(DbError),
    ConstraintViolation(ItemId),
    NotFound(ItemId),
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::InvalidInput,
            Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Db(err) if err.is_schema_error() => ErrorKind::SchemaMismatch,
            Self::Db(_) | Self::InvalidData(_) => ErrorKind::Io,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::ConstraintViolation(id) => write!(f, "item {id} already exists"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::ConstraintViolation(_) | Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for item storage.
pub trait ItemRepository {
    fn insert_item(&self, item: &Item, policy: ConflictPolicy) -> RepoResult<()>;
    fn insert_new_item(&self, item: &NewItem) -> RepoResult<ItemId>;
    /// Returns whether a row was removed.
    fn delete_item(&self, item: &Item) -> RepoResult<bool>;
    fn list_items(&self) -> RepoResult<Vec<Item>>;
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Constructs a repository from a prepared connection.
    ///
    /// # Errors
    /// - Schema errors when `conn` does not carry `ITEM_SCHEMA`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        verify_schema(conn, &ITEM_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Wraps a connection already verified by the caller.
    pub(crate) fn new_unchecked(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn insert_item(&self, item: &Item, policy: ConflictPolicy) -> RepoResult<()> {
        item.validate()?;

        let sql = match policy {
            ConflictPolicy::Abort => {
                "INSERT INTO items (id, name, description) VALUES (?1, ?2, ?3);"
            }
            ConflictPolicy::Replace => {
                "INSERT OR REPLACE INTO items (id, name, description) VALUES (?1, ?2, ?3);"
            }
        };

        self.conn
            .execute(
                sql,
                params![item.id, item.name.as_str(), item.description.as_deref()],
            )
            .map_err(|err| constraint_or_db(err, item.id))?;

        Ok(())
    }

    fn insert_new_item(&self, item: &NewItem) -> RepoResult<ItemId> {
        item.validate()?;

        self.conn.execute(
            "INSERT INTO items (name, description) VALUES (?1, ?2);",
            params![item.name.as_str(), item.description.as_deref()],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn delete_item(&self, item: &Item) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1;", [item.id])?;
        Ok(changed > 0)
    }

    fn list_items(&self) -> RepoResult<Vec<Item>> {
        let mut stmt = self.conn.prepare_cached(&ITEM_SCHEMA.select_all_sql())?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        Ok(items)
    }
}

fn constraint_or_db(err: rusqlite::Error, id: ItemId) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            RepoError::ConstraintViolation(id)
        }
        _ => err.into(),
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let item = Item {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
    };
    item.validate().map_err(|err| {
        RepoError::InvalidData(format!("row {} in items: {err}", item.id))
    })?;
    Ok(item)
}
