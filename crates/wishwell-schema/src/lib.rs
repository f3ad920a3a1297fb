//! Database schema model for wishwell.
//!
//! The schema is a fixed set of four tables (users, wishes, sessions,
//! supports) described as plain data and rendered to dialect-specific DDL
//! by [`build_schema`]. Schema creation runs once at startup, independent
//! of the request path.

use wishwell_sql::{index_name, unique_index_name};

mod ddl;
pub use ddl::{build_schema, create_index_sql, create_table_sql};

/// Table name constants shared by the schema, executor helpers and
/// repositories.
pub mod tables {
    pub const USERS: &str = "users";
    pub const WISHES: &str = "wishes";
    pub const SESSIONS: &str = "sessions";
    pub const SUPPORTS: &str = "supports";
}

/// A table definition.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: &'static str,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
}

/// A column definition.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub nullable: bool,
    pub unique: bool,
    pub default: Option<ColumnDefault>,
    pub references: Option<ForeignKey>,
}

impl Column {
    pub fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            primary_key: false,
            nullable: false,
            unique: false,
            default: None,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub fn references(mut self, fk: ForeignKey) -> Self {
        self.references = Some(fk);
        self
    }
}

/// Dialect-neutral column types, mapped to concrete SQL in the DDL builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Auto-incrementing integer primary key.
    Serial,
    /// 32-bit integer.
    Integer,
    /// Unbounded text.
    Text,
    /// Bounded text. Indexed string columns use this so MySQL can key them.
    VarChar(u16),
    /// Point in time. `TIMESTAMPTZ` / RFC 3339 `TEXT` / `DATETIME`.
    Timestamp,
}

/// Column default values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDefault {
    Int(i64),
    /// Insertion time, in the dialect's spelling.
    Now,
}

/// A foreign key reference emitted as a table-level constraint.
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
    pub on_delete: Option<OnDelete>,
}

impl ForeignKey {
    pub fn to(table: &'static str, column: &'static str) -> Self {
        Self {
            table,
            column,
            on_delete: None,
        }
    }

    pub fn on_delete(mut self, action: OnDelete) -> Self {
        self.on_delete = Some(action);
        self
    }
}

/// Referential delete actions used by this schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
}

impl OnDelete {
    pub fn as_sql(self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
        }
    }
}

/// An index definition.
#[derive(Debug, Clone)]
pub struct Index {
    pub name: String,
    pub columns: Vec<&'static str>,
    pub unique: bool,
    /// Partial-index predicate. Dialects without partial indexes drop it
    /// and rely on the application-level uniqueness check.
    pub where_clause: Option<&'static str>,
}

/// The four application tables, in creation order (referenced tables
/// first).
pub fn app_tables() -> Vec<Table> {
    vec![users_table(), wishes_table(), sessions_table(), supports_table()]
}

fn users_table() -> Table {
    Table {
        name: tables::USERS,
        columns: vec![
            Column::new("id", ColumnType::Serial).primary_key(),
            Column::new("google_id", ColumnType::VarChar(64)).unique(),
            Column::new("display_name", ColumnType::Text),
            Column::new("email", ColumnType::Text).nullable(),
            Column::new("picture", ColumnType::Text).nullable(),
            Column::new("created_at", ColumnType::Timestamp).default(ColumnDefault::Now),
        ],
        indexes: vec![],
    }
}

fn wishes_table() -> Table {
    Table {
        name: tables::WISHES,
        columns: vec![
            Column::new("id", ColumnType::VarChar(64)).primary_key(),
            Column::new("name", ColumnType::VarChar(64)).nullable(),
            Column::new("wish", ColumnType::VarChar(240)),
            Column::new("created_at", ColumnType::Timestamp).default(ColumnDefault::Now),
            Column::new("user_id", ColumnType::Integer)
                .nullable()
                .references(ForeignKey::to(tables::USERS, "id")),
            Column::new("support_count", ColumnType::Integer).default(ColumnDefault::Int(0)),
        ],
        indexes: vec![Index {
            name: index_name(tables::WISHES, &["created_at"]),
            columns: vec!["created_at"],
            unique: false,
            where_clause: None,
        }],
    }
}

fn sessions_table() -> Table {
    Table {
        name: tables::SESSIONS,
        columns: vec![
            Column::new("session_id", ColumnType::VarChar(128)).primary_key(),
            Column::new("wish_id", ColumnType::VarChar(64))
                .references(ForeignKey::to(tables::WISHES, "id")),
            Column::new("created_at", ColumnType::Timestamp).default(ColumnDefault::Now),
        ],
        indexes: vec![Index {
            name: index_name(tables::SESSIONS, &["wish_id"]),
            columns: vec!["wish_id"],
            unique: false,
            where_clause: None,
        }],
    }
}

fn supports_table() -> Table {
    Table {
        name: tables::SUPPORTS,
        columns: vec![
            Column::new("id", ColumnType::Serial).primary_key(),
            Column::new("wish_id", ColumnType::VarChar(64))
                .references(ForeignKey::to(tables::WISHES, "id").on_delete(OnDelete::Cascade)),
            Column::new("session_id", ColumnType::VarChar(128)).nullable(),
            Column::new("user_id", ColumnType::Integer)
                .nullable()
                .references(ForeignKey::to(tables::USERS, "id").on_delete(OnDelete::SetNull)),
            Column::new("created_at", ColumnType::Timestamp).default(ColumnDefault::Now),
        ],
        indexes: vec![
            // One support per session and per user for a given wish. The
            // partial predicates keep rows of the other identity kind out
            // of each index.
            Index {
                name: unique_index_name(tables::SUPPORTS, &["wish_id", "session_id"]),
                columns: vec!["wish_id", "session_id"],
                unique: true,
                where_clause: Some("session_id IS NOT NULL"),
            },
            Index {
                name: unique_index_name(tables::SUPPORTS, &["wish_id", "user_id"]),
                columns: vec!["wish_id", "user_id"],
                unique: true,
                where_clause: Some("user_id IS NOT NULL"),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_respects_references() {
        let tables = app_tables();
        let names: Vec<&str> = tables.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["users", "wishes", "sessions", "supports"]);

        // Every FK points at an earlier table.
        for (i, table) in tables.iter().enumerate() {
            for col in &table.columns {
                if let Some(fk) = &col.references {
                    let target = names.iter().position(|n| *n == fk.table).unwrap();
                    assert!(target < i, "{} references later table {}", table.name, fk.table);
                }
            }
        }
    }

    #[test]
    fn test_support_uniqueness_is_partial() {
        let supports = supports_table();
        let unique: Vec<_> = supports.indexes.iter().filter(|i| i.unique).collect();
        assert_eq!(unique.len(), 2);
        for idx in unique {
            assert!(idx.where_clause.is_some());
            assert_eq!(idx.columns[0], "wish_id");
        }
    }
}
