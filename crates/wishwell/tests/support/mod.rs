//! Shared test support: a scripted connection that records every query.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use wishwell::{Connection, Dialect, QueryOutput, Result, Row, Value};

/// A connection double: pops scripted responses in order and logs every
/// `(sql, params)` pair it receives. An empty script answers with an
/// empty result.
pub struct FakeConnection {
    dialect: Dialect,
    responses: Mutex<VecDeque<Result<QueryOutput>>>,
    log: Mutex<Vec<(String, Vec<Value>)>>,
}

impl FakeConnection {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            responses: Mutex::new(VecDeque::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(&self, output: QueryOutput) {
        self.responses.lock().unwrap().push_back(Ok(output));
    }

    pub fn respond_rows(&self, rows: Vec<Row>) {
        self.respond(QueryOutput::from_rows(rows));
    }

    pub fn respond_err(&self, err: wishwell::Error) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

impl Connection for FakeConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> Pin<Box<dyn Future<Output = Result<QueryOutput>> + Send + 'a>> {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryOutput::empty()));
        Box::pin(async move { response })
    }

    fn initialize_database(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}

/// A duplicate-key error as the SQLite driver reports it.
pub fn duplicate_key_error() -> wishwell::Error {
    wishwell::Error::from(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(2067),
        Some("UNIQUE constraint failed: supports.wish_id, supports.user_id".into()),
    ))
}

pub fn row(columns: &[(&str, Value)]) -> Row {
    Row::new(
        columns
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
    )
}

pub fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap()
}

/// A full wishes row as the batch loader's main query returns it.
pub fn wish_row(id: &str, user_id: Option<i64>, supported_by_viewer: bool) -> Row {
    row(&[
        ("id", Value::from(id)),
        ("name", Value::Null),
        ("wish", Value::from(format!("wish by {id}"))),
        ("created_at", Value::from(ts(1))),
        ("user_id", Value::from(user_id)),
        ("support_count", Value::from(0i64)),
        ("is_supported_by_viewer", Value::from(supported_by_viewer)),
    ])
}
