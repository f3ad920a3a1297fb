//! Dialect-neutral result rows.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::Error;
use crate::value::Value;

/// A row of data as column name → value pairs, in SELECT order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// Look up a column by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    fn read_error(&self, column: &str) -> Error {
        Error::ColumnRead {
            column: column.to_string(),
        }
    }

    /// Read a non-null text column.
    pub fn try_str(&self, name: &str) -> Result<&str, Error> {
        match self.get(name) {
            Some(Value::String(s)) => Ok(s),
            _ => Err(self.read_error(name)),
        }
    }

    /// Read a nullable text column.
    pub fn opt_str(&self, name: &str) -> Result<Option<&str>, Error> {
        match self.get(name) {
            Some(Value::Null) | None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            _ => Err(self.read_error(name)),
        }
    }

    /// Read a non-null integer column, widening 32-bit values.
    pub fn try_i64(&self, name: &str) -> Result<i64, Error> {
        match self.get(name) {
            Some(Value::I32(v)) => Ok(i64::from(*v)),
            Some(Value::I64(v)) => Ok(*v),
            _ => Err(self.read_error(name)),
        }
    }

    /// Read a nullable integer column.
    pub fn opt_i64(&self, name: &str) -> Result<Option<i64>, Error> {
        match self.get(name) {
            Some(Value::Null) | None => Ok(None),
            _ => self.try_i64(name).map(Some),
        }
    }

    /// Read a boolean column. SQLite and MySQL report booleans as 0/1
    /// integers.
    pub fn try_bool(&self, name: &str) -> Result<bool, Error> {
        match self.get(name) {
            Some(Value::Bool(v)) => Ok(*v),
            Some(Value::I32(v)) => Ok(*v != 0),
            Some(Value::I64(v)) => Ok(*v != 0),
            _ => Err(self.read_error(name)),
        }
    }

    /// Read a timestamp column. Text values are parsed as RFC 3339, with a
    /// fallback for the `YYYY-MM-DD HH:MM:SS` shape SQL timestamp defaults
    /// produce.
    pub fn try_timestamp(&self, name: &str) -> Result<DateTime<Utc>, Error> {
        match self.get(name) {
            Some(Value::Timestamp(ts)) => Ok(*ts),
            Some(Value::String(s)) => parse_timestamp(s).ok_or_else(|| self.read_error(name)),
            _ => Err(self.read_error(name)),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Result of executing a query.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    /// Result rows (empty for plain DML).
    pub rows: Vec<Row>,

    /// Number of rows returned, or affected for DML.
    pub row_count: u64,
}

impl QueryOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        let row_count = rows.len() as u64;
        Self { rows, row_count }
    }

    pub fn affected(row_count: u64) -> Self {
        Self {
            rows: Vec::new(),
            row_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let row = Row::new(vec![
            ("id".into(), Value::String("w1".into())),
            ("name".into(), Value::Null),
            ("support_count".into(), Value::I32(3)),
            ("is_supported".into(), Value::I64(1)),
        ]);
        assert_eq!(row.try_str("id").unwrap(), "w1");
        assert_eq!(row.opt_str("name").unwrap(), None);
        assert_eq!(row.try_i64("support_count").unwrap(), 3);
        assert!(row.try_bool("is_supported").unwrap());
        assert!(row.try_str("missing").is_err());
    }

    #[test]
    fn test_timestamp_parsing() {
        let row = Row::new(vec![
            ("a".into(), Value::String("2026-08-07T10:30:00Z".into())),
            ("b".into(), Value::String("2026-08-07 10:30:00".into())),
            ("c".into(), Value::String("not a date".into())),
        ]);
        let a = row.try_timestamp("a").unwrap();
        let b = row.try_timestamp("b").unwrap();
        assert_eq!(a, b);
        assert!(row.try_timestamp("c").is_err());
    }
}
