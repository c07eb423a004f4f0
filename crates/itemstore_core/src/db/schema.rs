//! Schema creation and verification against `PRAGMA user_version`.
//!
//! # Responsibility
//! - Create the declared table on a fresh database file.
//! - Verify an existing file carries the declared version and columns.
//!
//! # Invariants
//! - Table creation and the version stamp commit in one transaction.
//! - A file is fresh only when `user_version` is 0 and it holds no tables.
//! - On version mismatch only `PRAGMA user_version` and `sqlite_master` are
//!   read, and nothing is written.

use crate::db::{DbError, DbResult};
use crate::model::schema::EntitySchema;
use rusqlite::{Connection, OptionalExtension};

/// Creates or verifies `schema` on the provided connection.
pub fn prepare_schema(conn: &mut Connection, schema: &EntitySchema) -> DbResult<()> {
    debug_assert!(schema.is_well_formed(), "malformed schema `{}`", schema.entity);
    let stored = stored_version(conn)?;

    if stored == 0 {
        if user_table_count(conn)? > 0 {
            // Unversioned content written by something else.
            return Err(DbError::SchemaMismatch {
                db_version: 0,
                expected: schema.version,
            });
        }
        return create_schema(conn, schema);
    }

    verify_schema(conn, schema)
}

/// Reads the layout version stamped on the connection's main database.
///
/// The value is signed on disk; negative tags come back as-is so they can be
/// reported as a mismatch.
pub fn stored_version(conn: &Connection) -> DbResult<i64> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, i64>(0))?;
    Ok(version)
}

/// Checks that `schema` is fully present: version, table, and each column's
/// identity flag, declared type and nullability.
///
/// Used by repositories that receive a connection they did not open.
pub fn verify_schema(conn: &Connection, schema: &EntitySchema) -> DbResult<()> {
    let stored = stored_version(conn)?;
    if stored != i64::from(schema.version) {
        return Err(DbError::SchemaMismatch {
            db_version: stored,
            expected: schema.version,
        });
    }

    if !table_exists(conn, schema.table)? {
        return Err(DbError::MissingRequiredTable(schema.table));
    }

    let columns = table_columns(conn, schema.table)?;
    for column in schema.columns {
        let Some(stored_column) = columns.iter().find(|stored| stored.name == column.name) else {
            return Err(DbError::MissingRequiredColumn {
                table: schema.table,
                column: column.name,
            });
        };

        if stored_column.primary_key != column.primary_key {
            return Err(DbError::PrimaryKeyMismatch {
                table: schema.table,
                column: column.name,
            });
        }

        // The identity column is a rowid alias and never carries NOT NULL.
        let expect_not_null = !column.nullable && !column.primary_key;
        let type_matches = stored_column
            .declared_type
            .eq_ignore_ascii_case(column.kind.sql_type());
        if !type_matches || stored_column.not_null != expect_not_null {
            return Err(DbError::ColumnDefinitionMismatch {
                table: schema.table,
                column: column.name,
                stored: stored_column.describe(),
            });
        }
    }

    Ok(())
}

fn create_schema(conn: &mut Connection, schema: &EntitySchema) -> DbResult<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(&schema.create_table_sql())?;
    tx.execute_batch(&format!("PRAGMA user_version = {};", schema.version))?;
    tx.commit()?;
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn user_table_count(conn: &Connection) -> DbResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master
         WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%';",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

struct StoredColumn {
    name: String,
    declared_type: String,
    not_null: bool,
    primary_key: bool,
}

impl StoredColumn {
    fn describe(&self) -> String {
        let mut text = self.declared_type.clone();
        if self.primary_key {
            text.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            text.push_str(" NOT NULL");
        }
        text
    }
}

fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<StoredColumn>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let rows = stmt.query_map([], |row| {
        Ok(StoredColumn {
            name: row.get("name")?,
            declared_type: row.get("type")?,
            not_null: row.get::<_, i64>("notnull")? != 0,
            primary_key: row.get::<_, i64>("pk")? > 0,
        })
    })?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}
