//! MySQL connection adapter (mysql_async pool).

use std::future::Future;
use std::pin::Pin;

use chrono::{Datelike, NaiveDate, Timelike};
use mysql_async::prelude::Queryable;
use mysql_async::{Opts, OptsBuilder, Params, Pool, PoolConstraints, PoolOpts};
use tracing::Instrument;
use wishwell_schema::build_schema;
use wishwell_sql::Dialect;

use crate::config::DatabaseConfig;
use crate::error::Error;
use crate::row::{QueryOutput, Row};
use crate::value::Value;
use crate::Result;

use super::Connection;

/// A pooled MySQL connection.
pub struct MySqlConnection {
    pool: Pool,
}

impl MySqlConnection {
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let opts = Opts::from_url(&config.url).map_err(mysql_async::Error::from)?;
        let constraints =
            PoolConstraints::new(0, config.pool_size).unwrap_or_default();
        let opts = OptsBuilder::from_opts(opts)
            .pool_opts(PoolOpts::default().with_constraints(constraints));
        Ok(Self {
            pool: Pool::new(opts),
        })
    }

    async fn run(&self, sql: &str, params: &[Value]) -> Result<QueryOutput> {
        let mut conn = self.pool.get_conn().await?;

        let bound = if params.is_empty() {
            Params::Empty
        } else {
            Params::Positional(params.iter().map(value_to_mysql).collect())
        };

        let span = tracing::debug_span!(
            "db.query",
            dialect = "mysql",
            sql = %sql,
            params = params.len(),
            rows = tracing::field::Empty,
        );
        let mut result = conn.exec_iter(sql, bound).instrument(span.clone()).await?;
        let driver_rows: Vec<mysql_async::Row> =
            result.collect().instrument(span.clone()).await?;
        let affected = result.affected_rows();
        drop(result);

        if driver_rows.is_empty() {
            span.record("rows", affected);
            return Ok(QueryOutput::affected(affected));
        }

        span.record("rows", driver_rows.len());
        let rows = driver_rows
            .iter()
            .map(mysql_row_to_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(QueryOutput::from_rows(rows))
    }
}

impl Connection for MySqlConnection {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
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
            let mut conn = self.pool.get_conn().await?;
            // No multi-statement batches over the text protocol; run the
            // schema one statement at a time.
            for statement in build_schema(Dialect::MySql).split(';') {
                let statement = statement.trim();
                if !statement.is_empty() {
                    conn.query_drop(statement).await?;
                }
            }
            Ok(())
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async {
            self.pool.clone().disconnect().await?;
            Ok(())
        })
    }
}

fn value_to_mysql(value: &Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(v) => mysql_async::Value::Int(i64::from(*v)),
        Value::I32(v) => mysql_async::Value::Int(i64::from(*v)),
        Value::I64(v) => mysql_async::Value::Int(*v),
        Value::F64(v) => mysql_async::Value::Double(*v),
        Value::String(v) => mysql_async::Value::Bytes(v.clone().into_bytes()),
        Value::Timestamp(v) => {
            let naive = v.naive_utc();
            mysql_async::Value::Date(
                naive.year() as u16,
                naive.month() as u8,
                naive.day() as u8,
                naive.hour() as u8,
                naive.minute() as u8,
                naive.second() as u8,
                naive.and_utc().timestamp_subsec_micros(),
            )
        }
    }
}

fn mysql_row_to_row(row: &mysql_async::Row) -> Result<Row> {
    let mut columns = Vec::with_capacity(row.len());
    for (i, col) in row.columns_ref().iter().enumerate() {
        let name = col.name_str().to_string();
        let raw = row.as_ref(i).ok_or_else(|| Error::ColumnRead {
            column: name.clone(),
        })?;
        let value = mysql_value(&name, raw)?;
        columns.push((name, value));
    }
    Ok(Row::new(columns))
}

fn mysql_value(column: &str, value: &mysql_async::Value) -> Result<Value> {
    match value {
        mysql_async::Value::NULL => Ok(Value::Null),
        mysql_async::Value::Bytes(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|_| Error::ColumnRead {
                column: column.to_string(),
            })?;
            Ok(Value::String(text.to_string()))
        }
        mysql_async::Value::Int(v) => Ok(Value::I64(*v)),
        mysql_async::Value::UInt(v) => Ok(Value::I64(*v as i64)),
        mysql_async::Value::Float(v) => Ok(Value::F64(f64::from(*v))),
        mysql_async::Value::Double(v) => Ok(Value::F64(*v)),
        mysql_async::Value::Date(year, month, day, hour, minute, second, micros) => {
            let naive = NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
                .and_then(|date| {
                    date.and_hms_micro_opt(
                        u32::from(*hour),
                        u32::from(*minute),
                        u32::from(*second),
                        *micros,
                    )
                })
                .ok_or_else(|| Error::ColumnRead {
                    column: column.to_string(),
                })?;
            Ok(Value::Timestamp(chrono::DateTime::from_naive_utc_and_offset(
                naive,
                chrono::Utc,
            )))
        }
        mysql_async::Value::Time(..) => Err(Error::ColumnRead {
            column: column.to_string(),
        }),
    }
}
