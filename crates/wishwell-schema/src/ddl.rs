//! Dialect-specific DDL emission.
//!
//! Pure functions from the schema model to `CREATE TABLE` / `CREATE INDEX`
//! statements. Postgres and SQLite create indexes separately with
//! `IF NOT EXISTS` (including the partial unique indexes on `supports`);
//! MySQL has neither partial indexes nor `CREATE INDEX IF NOT EXISTS`, so
//! its keys are declared inline in the table definition.

use wishwell_sql::Dialect;

use crate::{Column, ColumnDefault, ColumnType, Index, Table, app_tables};

fn column_type_sql(dialect: Dialect, ty: ColumnType) -> String {
    match (dialect, ty) {
        (Dialect::Postgres, ColumnType::Serial) => "SERIAL".into(),
        (Dialect::Sqlite, ColumnType::Serial) => "INTEGER".into(),
        (Dialect::MySql, ColumnType::Serial) => "INT AUTO_INCREMENT".into(),

        (Dialect::MySql, ColumnType::Integer) => "INT".into(),
        (_, ColumnType::Integer) => "INTEGER".into(),

        (_, ColumnType::Text) => "TEXT".into(),
        (_, ColumnType::VarChar(n)) => format!("VARCHAR({n})"),

        (Dialect::Postgres, ColumnType::Timestamp) => "TIMESTAMPTZ".into(),
        // RFC 3339 text; the value layer parses it back.
        (Dialect::Sqlite, ColumnType::Timestamp) => "TEXT".into(),
        (Dialect::MySql, ColumnType::Timestamp) => "DATETIME".into(),
    }
}

fn column_default_sql(dialect: Dialect, default: ColumnDefault) -> String {
    match default {
        ColumnDefault::Int(n) => n.to_string(),
        ColumnDefault::Now => match dialect {
            Dialect::Postgres => "NOW()".into(),
            Dialect::Sqlite | Dialect::MySql => "CURRENT_TIMESTAMP".into(),
        },
    }
}

fn column_def_sql(dialect: Dialect, col: &Column) -> String {
    let mut def = format!(
        "    {} {}",
        dialect.quote_ident(col.name),
        column_type_sql(dialect, col.ty)
    );

    if col.primary_key {
        def.push_str(" PRIMARY KEY");
        // SQLite only auto-increments a column declared exactly as
        // INTEGER PRIMARY KEY AUTOINCREMENT.
        if col.ty == ColumnType::Serial && dialect == Dialect::Sqlite {
            def.push_str(" AUTOINCREMENT");
        }
    }

    if !col.nullable && !col.primary_key {
        def.push_str(" NOT NULL");
    }

    if col.unique && !col.primary_key {
        def.push_str(" UNIQUE");
    }

    if let Some(default) = col.default {
        def.push_str(&format!(" DEFAULT {}", column_default_sql(dialect, default)));
    }

    def
}

fn inline_key_sql(dialect: Dialect, idx: &Index) -> String {
    let kind = if idx.unique { "UNIQUE KEY" } else { "KEY" };
    let cols: Vec<String> = idx.columns.iter().map(|c| dialect.quote_ident(c)).collect();
    format!(
        "    {} {} ({})",
        kind,
        dialect.quote_ident(&idx.name),
        cols.join(", ")
    )
}

/// Generate the CREATE TABLE statement for a table.
pub fn create_table_sql(dialect: Dialect, table: &Table) -> String {
    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|col| column_def_sql(dialect, col))
        .collect();

    // Foreign keys as table-level constraints; MySQL ignores the inline
    // column REFERENCES form.
    for col in &table.columns {
        if let Some(fk) = &col.references {
            let mut clause = format!(
                "    FOREIGN KEY ({}) REFERENCES {} ({})",
                dialect.quote_ident(col.name),
                dialect.quote_ident(fk.table),
                dialect.quote_ident(fk.column)
            );
            if let Some(action) = fk.on_delete {
                clause.push_str(&format!(" ON DELETE {}", action.as_sql()));
            }
            parts.push(clause);
        }
    }

    if dialect == Dialect::MySql {
        for idx in &table.indexes {
            parts.push(inline_key_sql(dialect, idx));
        }
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        dialect.quote_ident(table.name),
        parts.join(",\n")
    )
}

/// Generate a CREATE INDEX statement for a table index.
///
/// Only meaningful for dialects that create indexes separately
/// (Postgres/SQLite); MySQL keys are inlined into the table definition.
pub fn create_index_sql(dialect: Dialect, table: &Table, idx: &Index) -> String {
    let unique = if idx.unique { "UNIQUE " } else { "" };
    let cols: Vec<String> = idx.columns.iter().map(|c| dialect.quote_ident(c)).collect();
    let where_clause = idx
        .where_clause
        .map(|w| format!(" WHERE {}", w))
        .unwrap_or_default();
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({}){};",
        unique,
        dialect.quote_ident(&idx.name),
        dialect.quote_ident(table.name),
        cols.join(", "),
        where_clause
    )
}

/// Generate the full DDL for the four application tables in one string,
/// tables in dependency order, indexes after their table.
pub fn build_schema(dialect: Dialect) -> String {
    let mut statements: Vec<String> = Vec::new();
    for table in app_tables() {
        statements.push(create_table_sql(dialect, &table));
        if dialect != Dialect::MySql {
            for idx in &table.indexes {
                statements.push(create_index_sql(dialect, &table, idx));
            }
        }
    }
    statements.join("\n\n")
}
