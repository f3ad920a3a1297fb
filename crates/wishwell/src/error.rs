use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("postgres pool error: {0}")]
    PostgresPool(#[from] deadpool_postgres::PoolError),

    #[error("postgres pool setup error: {0}")]
    PostgresPoolSetup(#[from] deadpool_postgres::CreatePoolError),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("mysql error: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("refusing to execute empty query text")]
    EmptyQuery,

    #[error("no value bound for parameter {name}")]
    MissingParam { name: String },

    #[error("column {column} is missing or has an unexpected type")]
    ColumnRead { column: String },

    #[error("{what} already exists")]
    AlreadyExists { what: &'static str },

    #[error("{what} not found")]
    NotFound { what: &'static str },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error is a duplicate-key constraint violation.
    ///
    /// Detection is substring matching over the driver message — the only
    /// signal all three drivers share. Callers with naturally idempotent
    /// operations translate a positive into an "already exists" outcome.
    pub fn is_duplicate_key(&self) -> bool {
        const MARKERS: &[&str] = &[
            // postgres
            "duplicate key value violates unique constraint",
            // sqlite
            "UNIQUE constraint failed",
            // mysql
            "Duplicate entry",
        ];
        let text = self.to_string();
        MARKERS.iter().any(|marker| text.contains(marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_detection() {
        let err = Error::from(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(2067),
            Some("UNIQUE constraint failed: supports.wish_id, supports.user_id".into()),
        ));
        assert!(err.is_duplicate_key());

        assert!(!Error::EmptyQuery.is_duplicate_key());
        assert!(!Error::NotFound { what: "wish" }.is_duplicate_key());
    }
}
