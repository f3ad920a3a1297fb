//! PostgreSQL connection adapter (deadpool pool over tokio-postgres).

use std::future::Future;
use std::pin::Pin;

use deadpool_postgres::{Config, PoolConfig, Runtime};
use tokio_postgres::NoTls;
use tokio_postgres::types::{IsNull, ToSql, Type};
use tracing::Instrument;
use wishwell_schema::build_schema;
use wishwell_sql::Dialect;

use crate::config::DatabaseConfig;
use crate::error::Error;
use crate::row::{QueryOutput, Row};
use crate::value::Value;
use crate::Result;

use super::Connection;

/// A pooled PostgreSQL connection.
pub struct PgConnection {
    pool: deadpool_postgres::Pool,
}

impl PgConnection {
    /// Build a pool from the configured URL. Connections are established
    /// lazily on first checkout.
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut cfg = Config::new();
        cfg.url = Some(config.url.clone());
        cfg.pool = Some(PoolConfig::new(config.pool_size));
        let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
        Ok(Self { pool })
    }

    async fn run(&self, sql: &str, params: &[Value]) -> Result<QueryOutput> {
        let client = self.pool.get().await?;

        let wrapped: Vec<SqlParam<'_>> = params.iter().map(SqlParam).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = wrapped
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect();

        let span = tracing::debug_span!(
            "db.query",
            dialect = "postgres",
            sql = %sql,
            params = params.len(),
            rows = tracing::field::Empty,
        );

        if returns_rows(sql) {
            let pg_rows = client.query(sql, &refs).instrument(span.clone()).await?;
            span.record("rows", pg_rows.len());
            let rows = pg_rows
                .iter()
                .map(pg_row_to_row)
                .collect::<Result<Vec<_>>>()?;
            Ok(QueryOutput::from_rows(rows))
        } else {
            let affected = client.execute(sql, &refs).instrument(span.clone()).await?;
            span.record("rows", affected);
            Ok(QueryOutput::affected(affected))
        }
    }
}

impl Connection for PgConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> Pin<Box<dyn Future<Output = Result<QueryOutput>> + Send + 'a>> {
        Box::pin(self.run(sql, params))
    }

    fn initialize_database(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async {
            let client = self.pool.get().await?;
            client.batch_execute(&build_schema(Dialect::Postgres)).await?;
            Ok(())
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async {
            self.pool.close();
            Ok(())
        })
    }
}

/// Whether the statement produces a row set (SELECT or RETURNING) rather
/// than an affected-row count.
fn returns_rows(sql: &str) -> bool {
    let head = sql.trim_start();
    head.get(..6)
        .is_some_and(|verb| verb.eq_ignore_ascii_case("select"))
        || sql.contains("RETURNING")
}

/// Convert a driver row into the dialect-neutral shape, keyed on the
/// result column types.
fn pg_row_to_row(pg_row: &tokio_postgres::Row) -> Result<Row> {
    let mut columns = Vec::with_capacity(pg_row.len());
    for (i, col) in pg_row.columns().iter().enumerate() {
        let ty = col.type_();
        let value = if *ty == Type::BOOL {
            pg_row
                .try_get::<_, Option<bool>>(i)?
                .map(Value::Bool)
                .unwrap_or(Value::Null)
        } else if *ty == Type::INT2 {
            pg_row
                .try_get::<_, Option<i16>>(i)?
                .map(|v| Value::I32(i32::from(v)))
                .unwrap_or(Value::Null)
        } else if *ty == Type::INT4 {
            pg_row
                .try_get::<_, Option<i32>>(i)?
                .map(Value::I32)
                .unwrap_or(Value::Null)
        } else if *ty == Type::INT8 {
            pg_row
                .try_get::<_, Option<i64>>(i)?
                .map(Value::I64)
                .unwrap_or(Value::Null)
        } else if *ty == Type::FLOAT4 {
            pg_row
                .try_get::<_, Option<f32>>(i)?
                .map(|v| Value::F64(f64::from(v)))
                .unwrap_or(Value::Null)
        } else if *ty == Type::FLOAT8 {
            pg_row
                .try_get::<_, Option<f64>>(i)?
                .map(Value::F64)
                .unwrap_or(Value::Null)
        } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR {
            pg_row
                .try_get::<_, Option<String>>(i)?
                .map(Value::String)
                .unwrap_or(Value::Null)
        } else if *ty == Type::TIMESTAMPTZ {
            pg_row
                .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(i)?
                .map(Value::Timestamp)
                .unwrap_or(Value::Null)
        } else if *ty == Type::TIMESTAMP {
            pg_row
                .try_get::<_, Option<chrono::NaiveDateTime>>(i)?
                .map(|naive| {
                    Value::Timestamp(chrono::DateTime::from_naive_utc_and_offset(
                        naive,
                        chrono::Utc,
                    ))
                })
                .unwrap_or(Value::Null)
        } else {
            return Err(Error::ColumnRead {
                column: col.name().to_string(),
            });
        };
        columns.push((col.name().to_string(), value));
    }
    Ok(Row::new(columns))
}

/// Wrapper to bind a [`Value`] as a tokio-postgres parameter.
///
/// Integer widths are coerced to the parameter's inferred type so i64
/// values bind cleanly against INTEGER columns and vice versa.
#[derive(Debug)]
struct SqlParam<'a>(&'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::I32(v) => {
                if *ty == Type::INT8 {
                    i64::from(*v).to_sql(ty, out)
                } else if *ty == Type::INT2 {
                    (*v as i16).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::I64(v) => {
                if *ty == Type::INT4 {
                    (*v as i32).to_sql(ty, out)
                } else if *ty == Type::INT2 {
                    (*v as i16).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::F64(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::String(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => {
                if *ty == Type::TIMESTAMP {
                    v.naive_utc().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::BOOL
                | Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
        )
    }

    tokio_postgres::types::to_sql_checked!();
}
