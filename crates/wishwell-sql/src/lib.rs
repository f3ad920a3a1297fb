//! SQL AST and rendering.
//!
//! Build SQL as a typed AST, then render it for a concrete [`Dialect`] with
//! automatic parameter placeholder accounting. The numbered dialect
//! deduplicates repeated named parameters; positional dialects emit one `?`
//! (and one params entry) per occurrence.

mod dialect;
pub use dialect::*;

mod expr;
pub use expr::*;

mod render;
pub use render::*;

mod stmt;
pub use stmt::*;

/// Result of rendering SQL.
#[derive(Debug, Clone)]
pub struct RenderedSql {
    /// The SQL string with dialect-specific placeholders.
    pub sql: String,

    /// Parameter names in placeholder order. For the numbered dialect each
    /// name appears once; for positional dialects a name appears once per
    /// placeholder occurrence.
    pub params: Vec<String>,
}

/// The name of a table (or table alias).
pub type TableName = String;

/// The name of a column (or column alias).
pub type ColumnName = String;

/// The name of a query parameter.
pub type ParamName = String;

/// A SQL string literal wrapper.
///
/// Display writes the value escaped and quoted with single quotes.
///
/// # Example
/// ```
/// use wishwell_sql::Lit;
/// assert_eq!(format!("{}", Lit("foo")), "'foo'");
/// assert_eq!(format!("{}", Lit("it's")), "'it''s'");
/// ```
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "'")
    }
}

/// Escape a string literal for SQL.
pub fn escape_string(s: &str) -> String {
    format!("{}", Lit(s))
}

/// Generate a standard index name for a table and columns.
///
/// Uses the convention `idx_{table}_{columns}` where columns are joined by underscore.
///
/// # Examples
///
/// ```
/// assert_eq!(wishwell_sql::index_name("wishes", &["user_id"]), "idx_wishes_user_id");
/// assert_eq!(
///     wishwell_sql::index_name("wishes", &["created_at", "id"]),
///     "idx_wishes_created_at_id"
/// );
/// ```
pub fn index_name(table: &str, columns: &[impl AsRef<str>]) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    format!("idx_{}_{}", table, cols.join("_"))
}

/// Generate a standard unique index name for a table and columns.
///
/// Uses the convention `uq_{table}_{columns}` where columns are joined by underscore.
///
/// # Examples
///
/// ```
/// assert_eq!(wishwell_sql::unique_index_name("users", &["google_id"]), "uq_users_google_id");
/// assert_eq!(
///     wishwell_sql::unique_index_name("supports", &["wish_id", "user_id"]),
///     "uq_supports_wish_id_user_id"
/// );
/// ```
pub fn unique_index_name(table: &str, columns: &[impl AsRef<str>]) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    format!("uq_{}_{}", table, cols.join("_"))
}
