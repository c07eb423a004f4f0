//! Explicit entity schema descriptions.
//!
//! # Responsibility
//! - Describe persisted tables as plain data: table name, columns, identity
//!   column and layout version.
//! - Render the DDL and read SQL consumed by `db` bootstrap and repositories.
//!
//! # Invariants
//! - Every schema declares exactly one primary-key column.
//! - `version` starts at 1 and only grows; there is no migration path, so a
//!   stored version different from the declared one is rejected on open.

/// Layout version of `ITEM_SCHEMA`.
pub const SCHEMA_VERSION: u32 = 1;

/// SQLite storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
        }
    }
}

/// One column of an entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub primary_key: bool,
    pub nullable: bool,
}

/// Persisted shape of one entity, bound to a layout version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    /// Entity name used in diagnostics.
    pub entity: &'static str,
    /// Backing table name.
    pub table: &'static str,
    /// Value mirrored to `PRAGMA user_version`.
    pub version: u32,
    pub columns: &'static [ColumnSpec],
}

/// Schema of the `Item` entity.
pub const ITEM_SCHEMA: EntitySchema = EntitySchema {
    entity: "Item",
    table: "items",
    version: SCHEMA_VERSION,
    columns: &[
        ColumnSpec {
            name: "id",
            kind: ColumnKind::Integer,
            primary_key: true,
            nullable: false,
        },
        ColumnSpec {
            name: "name",
            kind: ColumnKind::Text,
            primary_key: false,
            nullable: false,
        },
        ColumnSpec {
            name: "description",
            kind: ColumnKind::Text,
            primary_key: false,
            nullable: true,
        },
    ],
};

impl EntitySchema {
    /// Returns the identity column, if the schema declares exactly one.
    pub fn primary_key(&self) -> Option<&ColumnSpec> {
        let mut keys = self.columns.iter().filter(|column| column.primary_key);
        match (keys.next(), keys.next()) {
            (Some(key), None) => Some(key),
            _ => None,
        }
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.name).collect()
    }

    /// Checks structural invariants of the description itself.
    pub fn is_well_formed(&self) -> bool {
        self.version >= 1 && !self.table.is_empty() && self.primary_key().is_some()
    }

    /// Renders `CREATE TABLE` DDL for this schema.
    pub fn create_table_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let mut def = format!("{} {}", column.name, column.kind.sql_type());
                if column.primary_key {
                    // Rowid alias: NULL on insert means "assign the next id".
                    def.push_str(" PRIMARY KEY");
                } else if !column.nullable {
                    def.push_str(" NOT NULL");
                }
                def
            })
            .collect::<Vec<_>>()
            .join(",\n    ");
        format!("CREATE TABLE {} (\n    {}\n);", self.table, columns)
    }

    /// Renders the full-table read, ordered by identity.
    pub fn select_all_sql(&self) -> String {
        let order_by = self.primary_key().map_or("rowid", |key| key.name);
        format!(
            "SELECT {} FROM {} ORDER BY {} ASC;",
            self.column_names().join(", "),
            self.table,
            order_by
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnKind, ColumnSpec, EntitySchema, ITEM_SCHEMA};

    #[test]
    fn item_schema_is_well_formed() {
        assert!(ITEM_SCHEMA.is_well_formed());
        assert_eq!(ITEM_SCHEMA.primary_key().map(|key| key.name), Some("id"));
        assert_eq!(ITEM_SCHEMA.column_names(), vec!["id", "name", "description"]);
    }

    #[test]
    fn create_table_sql_marks_identity_and_nullability() {
        let sql = ITEM_SCHEMA.create_table_sql();
        assert!(sql.starts_with("CREATE TABLE items ("));
        assert!(sql.contains("id INTEGER PRIMARY KEY,"));
        assert!(sql.contains("name TEXT NOT NULL"));
        assert!(sql.ends_with("description TEXT\n);"));
    }

    #[test]
    fn select_all_orders_by_primary_key() {
        assert_eq!(
            ITEM_SCHEMA.select_all_sql(),
            "SELECT id, name, description FROM items ORDER BY id ASC;"
        );
    }

    #[test]
    fn schema_with_two_keys_has_no_primary_key() {
        const BROKEN: EntitySchema = EntitySchema {
            entity: "Broken",
            table: "broken",
            version: 1,
            columns: &[
                ColumnSpec {
                    name: "a",
                    kind: ColumnKind::Integer,
                    primary_key: true,
                    nullable: false,
                },
                ColumnSpec {
                    name: "b",
                    kind: ColumnKind::Integer,
                    primary_key: true,
                    nullable: false,
                },
            ],
        };
        assert!(BROKEN.primary_key().is_none());
        assert!(!BROKEN.is_well_formed());
    }
}
