//! Persistence and query-execution layer for the wishwell application.
//!
//! Users post a single wish; other users or anonymous sessions support
//! wishes. This crate owns everything between the domain layer and the
//! database:
//!
//! - a dialect-neutral [`Value`]/[`Row`] runtime model,
//! - the [`Connection`] trait with adapters for PostgreSQL (pooled),
//!   SQLite (single file) and MySQL (pooled),
//! - the [`QueryExecutor`] building CRUD/upsert/join SQL through
//!   `wishwell-sql` and the support-count primitives,
//! - the repositories, most notably [`WishRepository`] with the
//!   three-query batch loader assembling wish view objects for a page in
//!   constant query count,
//! - schema bootstrap via `wishwell-schema`.
//!
//! HTTP routing, OAuth, cookie policy and rendering live elsewhere; the
//! domain layer hands this crate already-validated value objects.
//!
//! Repository operations are short sequences of independent query
//! round-trips with no cross-query transaction: reads are
//! consistent-enough rather than snapshots, and write races on supports
//! are settled by the unique indexes, not in-process coordination.

pub mod config;
pub mod conn;
mod error;
pub mod executor;
mod identity;
pub mod repo;
mod row;
mod value;

pub use config::DatabaseConfig;
pub use conn::{Connection, MySqlConnection, PgConnection, SqliteConnection, connect};
pub use error::Error;
pub use executor::{JoinClause, JoinSelect, Order, QueryExecutor, SelectOptions};
pub use identity::Identity;
pub use repo::{
    GoogleProfile, NewWish, SessionRepository, UserRecord, UserRepository, WishRecord,
    WishRepository, WishView,
};
pub use row::{QueryOutput, Row};
pub use value::Value;

// Re-export the pieces callers compose with.
pub use wishwell_schema::{build_schema, tables};
pub use wishwell_sql::Dialect;

/// Result type for wishwell operations.
pub type Result<T> = std::result::Result<T, Error>;
