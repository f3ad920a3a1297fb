//! Declarative query execution.
//!
//! The executor translates declarative requests into the typed statement
//! AST, renders them for its connection's dialect, binds the rendered
//! parameter order to concrete values, and executes. Table and column
//! names are trusted internal input; errors from the connection propagate
//! unchanged.

use std::sync::Arc;

use indexmap::IndexMap;
use wishwell_schema::tables;
use wishwell_sql::{
    ColumnName, ConflictAction, DeleteStmt, Dialect, Expr, FromClause, InsertStmt, Join, JoinKind,
    OnConflict, OrderBy, ParamName, RenderedSql, SelectColumn, SelectStmt, TableName,
    UpdateAssignment, UpdateStmt, render,
};

use crate::Result;
use crate::conn::Connection;
use crate::error::Error;
use crate::row::QueryOutput;
use crate::value::Value;

/// Named parameter values collected while building a statement, bound to
/// the rendered placeholder order at execution time.
#[derive(Debug, Default)]
struct ParamValues {
    values: IndexMap<ParamName, Value>,
}

impl ParamValues {
    fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, name: impl Into<ParamName>, value: Value) {
        self.values.insert(name.into(), value);
    }

    fn bind(&self, order: &[ParamName]) -> Result<Vec<Value>> {
        order
            .iter()
            .map(|name| {
                self.values
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::MissingParam { name: name.clone() })
            })
            .collect()
    }
}

/// WHERE parameters get their own namespace so a condition on a column
/// never collides with a SET value or the limit/offset parameters.
fn where_param(column: &str) -> String {
    format!("w.{column}")
}

/// Sort direction for [`SelectOptions::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Options for [`QueryExecutor::select`]. Every `where_eq` entry becomes
/// an equality predicate conjoined with AND.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Columns to select; empty means `*`.
    pub columns: Vec<ColumnName>,
    pub where_eq: Vec<(ColumnName, Value)>,
    pub order_by: Vec<(ColumnName, Order)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One JOIN in a [`JoinSelect`].
#[derive(Debug, Clone)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: TableName,
    pub alias: Option<TableName>,
    pub on: Expr,
}

/// A select over a main table plus an ordered list of JOINs.
///
/// Expressions referencing named parameters take their values from
/// `params`; `limit`/`offset` bind automatically.
#[derive(Debug, Clone, Default)]
pub struct JoinSelect {
    pub table: TableName,
    pub alias: Option<TableName>,
    pub distinct: bool,
    pub columns: Vec<SelectColumn>,
    pub joins: Vec<JoinClause>,
    pub where_: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub params: Vec<(ParamName, Value)>,
}

/// Builds SQL for one dialect and executes it on a [`Connection`].
#[derive(Clone)]
pub struct QueryExecutor {
    conn: Arc<dyn Connection>,
    dialect: Dialect,
}

impl QueryExecutor {
    pub fn new(conn: Arc<dyn Connection>) -> Self {
        let dialect = conn.dialect();
        Self { conn, dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    async fn execute(&self, rendered: RenderedSql, values: &ParamValues) -> Result<QueryOutput> {
        let params = values.bind(&rendered.params)?;
        self.run(&rendered.sql, params).await
    }

    async fn run(&self, sql: &str, params: Vec<Value>) -> Result<QueryOutput> {
        if sql.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }
        self.conn.query(sql, &params).await
    }

    /// `INSERT INTO table (cols) VALUES (…)`, params in `data` key order.
    pub async fn insert(&self, table: &str, data: &[(&str, Value)]) -> Result<QueryOutput> {
        let mut stmt = InsertStmt::new(table);
        let mut values = ParamValues::new();
        for (column, value) in data {
            stmt = stmt.column(*column, Expr::param(*column));
            values.insert(*column, value.clone());
        }
        self.execute(render(self.dialect, &stmt), &values).await
    }

    /// Equality-filtered SELECT. Parameter indices increase monotonically
    /// across WHERE, LIMIT, OFFSET in that order.
    pub async fn select(&self, table: &str, opts: SelectOptions) -> Result<QueryOutput> {
        let mut stmt = SelectStmt::new();
        for column in &opts.columns {
            stmt = stmt.column(SelectColumn::expr(Expr::column(column.clone())));
        }
        stmt = stmt.from(FromClause::table(table));

        let mut values = ParamValues::new();
        for (column, value) in &opts.where_eq {
            let name = where_param(column);
            stmt = stmt.and_where(Expr::column(column.clone()).eq(Expr::param(name.clone())));
            values.insert(name, value.clone());
        }
        for (column, order) in &opts.order_by {
            let expr = Expr::column(column.clone());
            stmt = stmt.order_by(match order {
                Order::Asc => OrderBy::asc(expr),
                Order::Desc => OrderBy::desc(expr),
            });
        }
        if let Some(limit) = opts.limit {
            stmt = stmt.limit(Expr::param("limit"));
            values.insert("limit", Value::I64(limit));
        }
        if let Some(offset) = opts.offset {
            stmt = stmt.offset(Expr::param("offset"));
            values.insert("offset", Value::I64(offset));
        }
        self.execute(render(self.dialect, &stmt), &values).await
    }

    /// `UPDATE table SET … WHERE …`; SET params precede WHERE params.
    pub async fn update(
        &self,
        table: &str,
        data: &[(&str, Value)],
        conditions: &[(&str, Value)],
    ) -> Result<QueryOutput> {
        let mut stmt = UpdateStmt::new(table);
        let mut values = ParamValues::new();
        for (column, value) in data {
            stmt = stmt.set(*column, Expr::param(*column));
            values.insert(*column, value.clone());
        }
        for (column, value) in conditions {
            let name = where_param(column);
            stmt = stmt.and_where(Expr::column(*column).eq(Expr::param(name.clone())));
            values.insert(name, value.clone());
        }
        self.execute(render(self.dialect, &stmt), &values).await
    }

    /// `DELETE FROM table WHERE …`.
    pub async fn delete(&self, table: &str, conditions: &[(&str, Value)]) -> Result<QueryOutput> {
        let mut stmt = DeleteStmt::new(table);
        let mut values = ParamValues::new();
        for (column, value) in conditions {
            let name = where_param(column);
            stmt = stmt.and_where(Expr::column(*column).eq(Expr::param(name.clone())));
            values.insert(name, value.clone());
        }
        self.execute(render(self.dialect, &stmt), &values).await
    }

    /// Insert-or-update keyed on `conflict_columns`.
    ///
    /// Conflict target columns and `created_at` keep insert-only
    /// semantics: they never appear in the conflict UPDATE clause. When
    /// nothing remains to update, the statement degrades to the dialect's
    /// no-op conflict clause instead of an empty SET.
    pub async fn upsert(
        &self,
        table: &str,
        data: &[(&str, Value)],
        conflict_columns: &[&str],
    ) -> Result<QueryOutput> {
        let mut stmt = InsertStmt::new(table);
        let mut values = ParamValues::new();
        for (column, value) in data {
            stmt = stmt.column(*column, Expr::param(*column));
            values.insert(*column, value.clone());
        }

        let update_columns: Vec<&str> = data
            .iter()
            .map(|(column, _)| *column)
            .filter(|column| !conflict_columns.contains(column) && *column != "created_at")
            .collect();
        let action = if update_columns.is_empty() {
            ConflictAction::DoNothing
        } else {
            ConflictAction::DoUpdate(
                update_columns
                    .iter()
                    .map(|column| UpdateAssignment::new(*column, Expr::excluded(*column)))
                    .collect(),
            )
        };
        stmt = stmt.on_conflict(OnConflict {
            columns: conflict_columns.iter().map(|c| c.to_string()).collect(),
            action,
        });

        self.execute(render(self.dialect, &stmt), &values).await
    }

    /// SELECT over a main table plus JOINs, with the same left-to-right
    /// parameter accounting as [`QueryExecutor::select`].
    pub async fn select_with_join(&self, query: JoinSelect) -> Result<QueryOutput> {
        let mut stmt = SelectStmt::new();
        if query.distinct {
            stmt = stmt.distinct();
        }
        stmt = stmt.columns(query.columns);
        stmt = stmt.from(match query.alias {
            Some(alias) => FromClause::aliased(query.table, alias),
            None => FromClause::table(query.table),
        });
        for join in query.joins {
            stmt = stmt.join(Join {
                kind: join.kind,
                table: join.table,
                alias: join.alias,
                on: join.on,
            });
        }
        if let Some(where_) = query.where_ {
            stmt = stmt.where_(where_);
        }
        for expr in query.group_by {
            stmt = stmt.group_by(expr);
        }
        if let Some(having) = query.having {
            stmt = stmt.having(having);
        }
        for order in query.order_by {
            stmt = stmt.order_by(order);
        }

        let mut values = ParamValues::new();
        for (name, value) in query.params {
            values.insert(name, value);
        }
        if let Some(limit) = query.limit {
            stmt = stmt.limit(Expr::param("limit"));
            values.insert("limit", Value::I64(limit));
        }
        if let Some(offset) = query.offset {
            stmt = stmt.offset(Expr::param("offset"));
            values.insert("offset", Value::I64(offset));
        }

        self.execute(render(self.dialect, &stmt), &values).await
    }

    /// Bump the denormalized counter by one.
    ///
    /// Prefer [`QueryExecutor::update_support_count`] whenever the
    /// mutation already touched the supports table; the arithmetic
    /// primitives exist for contexts that cannot afford the recount.
    pub async fn increment_support_count(&self, wish_id: &str) -> Result<QueryOutput> {
        let stmt = UpdateStmt::new(tables::WISHES)
            .set(
                "support_count",
                Expr::column("support_count").add(Expr::int(1)),
            )
            .where_(Expr::column("id").eq(Expr::param("wish_id")));
        let mut values = ParamValues::new();
        values.insert("wish_id", Value::from(wish_id));
        self.execute(render(self.dialect, &stmt), &values).await
    }

    /// Drop the denormalized counter by one, clamped at zero.
    pub async fn decrement_support_count(&self, wish_id: &str) -> Result<QueryOutput> {
        let clamp = Expr::Greatest(vec![
            Expr::column("support_count").sub(Expr::int(1)),
            Expr::int(0),
        ]);
        let stmt = UpdateStmt::new(tables::WISHES)
            .set("support_count", clamp)
            .where_(Expr::column("id").eq(Expr::param("wish_id")));
        let mut values = ParamValues::new();
        values.insert("wish_id", Value::from(wish_id));
        self.execute(render(self.dialect, &stmt), &values).await
    }

    /// Set the counter to the authoritative `COUNT(*)` of the supports
    /// table. This is the recomputation used after every support
    /// mutation; it cannot drift under concurrent writers.
    pub async fn update_support_count(&self, wish_id: &str) -> Result<QueryOutput> {
        let recount = SelectStmt::new()
            .column(SelectColumn::expr(Expr::raw("COUNT(*)")))
            .from(FromClause::table(tables::SUPPORTS))
            .where_(Expr::column("wish_id").eq(Expr::param("wish_id")));
        let stmt = UpdateStmt::new(tables::WISHES)
            .set("support_count", Expr::Subquery(Box::new(recount)))
            .where_(Expr::column("id").eq(Expr::param("wish_id")));
        let mut values = ParamValues::new();
        values.insert("wish_id", Value::from(wish_id));
        self.execute(render(self.dialect, &stmt), &values).await
    }

    /// Escape hatch: execute verbatim SQL through the same connection.
    pub async fn raw(&self, sql: &str, params: Vec<Value>) -> Result<QueryOutput> {
        self.run(sql, params).await
    }
}
