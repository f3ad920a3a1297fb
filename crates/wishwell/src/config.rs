//! Database configuration.
//!
//! The dialect is an explicit configuration value passed in at
//! construction time; the library itself never branches on ambient
//! environment variables. [`DatabaseConfig::from_env`] exists for
//! binaries that want the conventional env wiring.

use wishwell_sql::Dialect;

use crate::error::Error;

/// Connection configuration for one database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Which SQL dialect to build queries and DDL for.
    pub dialect: Dialect,
    /// Driver-specific connection URL, or a file path / `:memory:` for
    /// SQLite.
    pub url: String,
    /// Pool size for the pooled backends; ignored by SQLite's single
    /// shared handle.
    pub pool_size: usize,
}

impl DatabaseConfig {
    pub fn new(dialect: Dialect, url: impl Into<String>) -> Self {
        Self {
            dialect,
            url: url.into(),
            pool_size: 10,
        }
    }

    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Read configuration from `DATABASE_DIALECT`, `DATABASE_URL` and
    /// `DATABASE_POOL_SIZE`, loading a `.env` file first if present.
    pub fn from_env() -> Result<Self, Error> {
        dotenvy::dotenv().ok();

        let dialect = std::env::var("DATABASE_DIALECT")
            .map_err(|_| Error::Config("DATABASE_DIALECT is not set".into()))?
            .parse::<Dialect>()
            .map_err(|e| Error::Config(e.to_string()))?;
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".into()))?;
        let pool_size = match std::env::var("DATABASE_POOL_SIZE") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|_| Error::Config("DATABASE_POOL_SIZE must be an integer".into()))?,
            Err(_) => 10,
        };

        Ok(Self {
            dialect,
            url,
            pool_size,
        })
    }
}
