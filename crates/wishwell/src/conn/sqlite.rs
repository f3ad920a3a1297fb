//! SQLite connection adapter (single shared rusqlite handle).
//!
//! SQLite is an embedded single-file database: there is no pool, just one
//! handle behind an async mutex. Timestamps travel as RFC 3339 text and
//! booleans as 0/1 integers.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::Mutex;
use wishwell_schema::build_schema;
use wishwell_sql::Dialect;

use crate::config::DatabaseConfig;
use crate::error::Error;
use crate::row::{QueryOutput, Row};
use crate::value::Value;
use crate::Result;

use super::Connection;

/// A single-file (or in-memory) SQLite connection.
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Open the database file named by the config URL (`:memory:` for an
    /// in-memory database). Foreign key enforcement is switched on, which
    /// SQLite leaves off by default.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let conn = if config.url == ":memory:" {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(&config.url)?
        };
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn run_sync(conn: &rusqlite::Connection, sql: &str, params: &[Value]) -> Result<QueryOutput> {
        let mut stmt = conn.prepare(sql)?;
        let bound = rusqlite::params_from_iter(params.iter().map(value_to_sqlite));

        if stmt.column_count() == 0 {
            let affected = stmt.execute(bound)?;
            return Ok(QueryOutput::affected(affected as u64));
        }

        let names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let mut out = Vec::new();
        let mut rows = stmt.query(bound)?;
        while let Some(row) = rows.next()? {
            let mut columns = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                columns.push((name.clone(), sqlite_value(name, row.get_ref(i)?)?));
            }
            out.push(Row::new(columns));
        }
        Ok(QueryOutput::from_rows(out))
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> Pin<Box<dyn Future<Output = Result<QueryOutput>> + Send + 'a>> {
        Box::pin(async move {
            let conn = self.conn.lock().await;
            let span = tracing::debug_span!(
                "db.query",
                dialect = "sqlite",
                sql = %sql,
                params = params.len(),
            );
            span.in_scope(|| Self::run_sync(&conn, sql, params))
        })
    }

    fn initialize_database(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async {
            let conn = self.conn.lock().await;
            conn.execute_batch(&build_schema(Dialect::Sqlite))?;
            Ok(())
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // The handle closes when the connection is dropped; nothing is
        // pooled here.
        Box::pin(async { Ok(()) })
    }
}

fn value_to_sqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(v) => rusqlite::types::Value::Integer(i64::from(*v)),
        Value::I32(v) => rusqlite::types::Value::Integer(i64::from(*v)),
        Value::I64(v) => rusqlite::types::Value::Integer(*v),
        Value::F64(v) => rusqlite::types::Value::Real(*v),
        Value::String(v) => rusqlite::types::Value::Text(v.clone()),
        Value::Timestamp(v) => rusqlite::types::Value::Text(v.to_rfc3339()),
    }
}

fn sqlite_value(column: &str, value: rusqlite::types::ValueRef<'_>) -> Result<Value> {
    match value {
        rusqlite::types::ValueRef::Null => Ok(Value::Null),
        rusqlite::types::ValueRef::Integer(v) => Ok(Value::I64(v)),
        rusqlite::types::ValueRef::Real(v) => Ok(Value::F64(v)),
        rusqlite::types::ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|_| Error::ColumnRead {
                column: column.to_string(),
            })?;
            Ok(Value::String(text.to_string()))
        }
        rusqlite::types::ValueRef::Blob(_) => Err(Error::ColumnRead {
            column: column.to_string(),
        }),
    }
}
