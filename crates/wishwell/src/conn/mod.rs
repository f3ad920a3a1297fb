//! Database connections.
//!
//! A [`Connection`] executes `(sql, params)` against a concrete database
//! and owns pooling/transport. Three families exist: a deadpool-backed
//! Postgres pool, a single-file SQLite handle, and a mysql_async pool.
//! The trait returns boxed futures so it stays usable as a trait object
//! behind `Arc<dyn Connection>`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use wishwell_sql::Dialect;

use crate::config::DatabaseConfig;
use crate::row::QueryOutput;
use crate::value::Value;
use crate::Result;

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlConnection;
pub use postgres::PgConnection;
pub use sqlite::SqliteConnection;

/// A database connection (or pool of them).
pub trait Connection: Send + Sync {
    /// The dialect this connection's database speaks.
    fn dialect(&self) -> Dialect;

    /// Execute a query, returning rows and a row count (affected rows for
    /// plain DML).
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> Pin<Box<dyn Future<Output = Result<QueryOutput>> + Send + 'a>>;

    /// Create the application schema for this connection's dialect.
    fn initialize_database(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Release pooled connections. Further queries are undefined.
    fn close(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Open a connection for the configured dialect.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Connection>> {
    match config.dialect {
        Dialect::Postgres => Ok(Arc::new(PgConnection::connect(config)?)),
        Dialect::MySql => Ok(Arc::new(MySqlConnection::connect(config)?)),
        Dialect::Sqlite => Ok(Arc::new(SqliteConnection::open(config)?)),
    }
}
