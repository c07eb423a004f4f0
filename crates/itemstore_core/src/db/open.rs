//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by store behavior.
//! - Prepare the declared schema before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have the declared table created or verified.
//! - A failed open leaves no half-prepared connection behind.

use super::schema::prepare_schema;
use super::{DbError, DbResult};
use crate::model::schema::EntitySchema;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Busy timeout applied when callers do not configure one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file and prepares `schema` with the default busy
/// timeout.
///
/// # Side effects
/// - Creates the file when missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>, schema: &EntitySchema) -> DbResult<Connection> {
    open_db_with_timeout(path, schema, DEFAULT_BUSY_TIMEOUT)
}

/// Opens a SQLite database file and prepares `schema`.
///
/// # Errors
/// - `DbError::Sqlite` when the file cannot be opened or is not a database.
/// - Schema errors (`SchemaMismatch`, `MissingRequiredTable`, ...) when the
///   stored layout does not match `schema`.
pub fn open_db_with_timeout(
    path: impl AsRef<Path>,
    schema: &EntitySchema,
    busy_timeout: Duration,
) -> DbResult<Connection> {
    bootstrap("file", schema, busy_timeout, || Connection::open(path))
}

/// Opens an in-memory SQLite database and prepares `schema`.
pub fn open_db_in_memory(schema: &EntitySchema) -> DbResult<Connection> {
    bootstrap("memory", schema, DEFAULT_BUSY_TIMEOUT, Connection::open_in_memory)
}

fn bootstrap(
    mode: &str,
    schema: &EntitySchema,
    busy_timeout: Duration,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode={mode} table={}",
        schema.table
    );

    let mut conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    let prepared = conn
        .busy_timeout(busy_timeout)
        .map_err(DbError::from)
        .and_then(|()| prepare_schema(&mut conn, schema));

    match prepared {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={} schema_version={}",
                started_at.elapsed().as_millis(),
                schema.version
            );
            Ok(conn)
        }
        Err(err) => {
            let error_code = if err.is_schema_error() {
                "db_schema_mismatch"
            } else {
                "db_bootstrap_failed"
            };
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code={error_code} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}
