//! SQL dialect strategies.
//!
//! Only the syntactic fragments that differ between backends live here:
//! placeholder style, identifier quoting, capability flags, and the
//! max-of-two function used for counter clamping. The shared statement
//! rendering in [`crate::render`] consumes a `Dialect` instead of branching
//! per backend.

use std::str::FromStr;

/// The SQL dialect a statement is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// PostgreSQL: `$1, $2, …` placeholders, double-quoted identifiers.
    Postgres,
    /// MySQL: `?` placeholders, backtick-quoted identifiers.
    MySql,
    /// SQLite: `?` placeholders, double-quoted identifiers.
    Sqlite,
}

impl Dialect {
    /// Stable lowercase dialect name.
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Placeholder token for the 1-based parameter index `idx`.
    ///
    /// Pure mapping, no side effects: `$idx` for Postgres, `?` otherwise.
    pub fn placeholder(self, idx: usize) -> String {
        match self {
            Dialect::Postgres => format!("${idx}"),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Whether placeholders carry a number (and repeated named parameters
    /// collapse onto one index) or are purely positional.
    pub(crate) fn numbered_params(self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    /// Whether `INSERT … RETURNING` is available.
    pub fn supports_returning(self) -> bool {
        match self {
            Dialect::Postgres | Dialect::Sqlite => true,
            Dialect::MySql => false,
        }
    }

    /// Whether a native upsert clause is available.
    pub fn supports_upsert(self) -> bool {
        true
    }

    /// Quote an identifier, doubling any embedded quote characters.
    ///
    /// Identifiers are always quoted so reserved words like `user` or
    /// `order` stay usable as table/column names.
    pub fn quote_ident(self, name: &str) -> String {
        let quote = match self {
            Dialect::Postgres | Dialect::Sqlite => '"',
            Dialect::MySql => '`',
        };
        let mut out = String::with_capacity(name.len() + 2);
        out.push(quote);
        for c in name.chars() {
            if c == quote {
                out.push(quote);
            }
            out.push(c);
        }
        out.push(quote);
        out
    }

    /// The scalar max-of-two function: `GREATEST` on Postgres/MySQL, `MAX`
    /// on SQLite. Semantics are identical.
    pub fn greatest_fn(self) -> &'static str {
        match self {
            Dialect::Postgres | Dialect::MySql => "GREATEST",
            Dialect::Sqlite => "MAX",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown dialect name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDialect(pub String);

impl std::fmt::Display for UnknownDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown dialect: {}", self.0)
    }
}

impl std::error::Error for UnknownDialect {}

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(UnknownDialect(other.to_string())),
        }
    }
}
