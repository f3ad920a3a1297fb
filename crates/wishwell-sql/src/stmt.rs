//! SQL statements.

use crate::expr::Expr;
use crate::{ColumnName, TableName};

/// A SQL statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    Select(SelectStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
}

/// A SELECT statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectStmt {
    pub distinct: bool,
    pub columns: Vec<SelectColumn>,
    pub from: Option<FromClause>,
    pub joins: Vec<Join>,
    pub where_: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

/// A column in a SELECT clause.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// An expression, optionally aliased
    Expr {
        expr: Expr,
        alias: Option<ColumnName>,
    },

    /// All columns from a table: table.*
    AllFrom(TableName),
}

impl SelectColumn {
    pub fn expr(expr: Expr) -> Self {
        SelectColumn::Expr { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: impl Into<ColumnName>) -> Self {
        SelectColumn::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }

    pub fn all_from(table: impl Into<TableName>) -> Self {
        SelectColumn::AllFrom(table.into())
    }
}

/// A FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub table: TableName,
    pub alias: Option<TableName>,
}

impl FromClause {
    pub fn table(name: impl Into<TableName>) -> Self {
        Self {
            table: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<TableName>, alias: impl Into<TableName>) -> Self {
        Self {
            table: name.into(),
            alias: Some(alias.into()),
        }
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableName,
    pub alias: Option<TableName>,
    pub on: Expr,
}

/// Type of JOIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// ORDER BY clause.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub desc: bool,
}

impl OrderBy {
    pub fn asc(expr: Expr) -> Self {
        Self { expr, desc: false }
    }

    pub fn desc(expr: Expr) -> Self {
        Self { expr, desc: true }
    }
}

// ============================================================================
// INSERT statement
// ============================================================================

/// An INSERT statement.
#[derive(Debug, Clone)]
pub struct InsertStmt {
    pub table: TableName,
    pub columns: Vec<ColumnName>,
    pub values: Vec<Expr>,
    pub on_conflict: Option<OnConflict>,
    pub returning: Vec<ColumnName>,
}

/// Conflict clause for upsert.
///
/// Rendered as `ON CONFLICT (cols) …` on Postgres/SQLite and
/// `ON DUPLICATE KEY UPDATE …` on MySQL (where the conflict target is
/// implied by the table's unique keys, but must still be non-empty so the
/// no-op form has a column to reference).
#[derive(Debug, Clone)]
pub struct OnConflict {
    /// Conflict target columns
    pub columns: Vec<ColumnName>,
    /// What to do on conflict
    pub action: ConflictAction,
}

/// What to do on conflict.
#[derive(Debug, Clone)]
pub enum ConflictAction {
    /// DO NOTHING (or the dialect's no-op assignment)
    DoNothing,
    /// DO UPDATE SET ...
    DoUpdate(Vec<UpdateAssignment>),
}

/// An assignment in UPDATE SET or a conflict UPDATE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAssignment {
    pub column: ColumnName,
    pub value: Expr,
}

impl UpdateAssignment {
    pub fn new(column: impl Into<ColumnName>, value: Expr) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

// ============================================================================
// UPDATE statement
// ============================================================================

/// An UPDATE statement.
#[derive(Debug, Clone)]
pub struct UpdateStmt {
    pub table: TableName,
    pub assignments: Vec<UpdateAssignment>,
    pub where_: Option<Expr>,
}

// ============================================================================
// DELETE statement
// ============================================================================

/// A DELETE statement.
#[derive(Debug, Clone)]
pub struct DeleteStmt {
    pub table: TableName,
    pub where_: Option<Expr>,
}

// ============================================================================
// Builder-style constructors
// ============================================================================

impl SelectStmt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn column(mut self, col: SelectColumn) -> Self {
        self.columns.push(col);
        self
    }

    pub fn columns(mut self, cols: impl IntoIterator<Item = SelectColumn>) -> Self {
        self.columns.extend(cols);
        self
    }

    pub fn from(mut self, from: FromClause) -> Self {
        self.from = Some(from);
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn where_(mut self, expr: Expr) -> Self {
        self.where_ = Some(expr);
        self
    }

    pub fn and_where(mut self, expr: Expr) -> Self {
        self.where_ = Some(match self.where_ {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
        self
    }

    pub fn having(mut self, expr: Expr) -> Self {
        self.having = Some(expr);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn limit(mut self, expr: Expr) -> Self {
        self.limit = Some(expr);
        self
    }

    pub fn offset(mut self, expr: Expr) -> Self {
        self.offset = Some(expr);
        self
    }
}

impl InsertStmt {
    pub fn new(table: impl Into<TableName>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
            on_conflict: None,
            returning: Vec::new(),
        }
    }

    pub fn column(mut self, name: impl Into<ColumnName>, value: Expr) -> Self {
        self.columns.push(name.into());
        self.values.push(value);
        self
    }

    pub fn on_conflict(mut self, conflict: OnConflict) -> Self {
        self.on_conflict = Some(conflict);
        self
    }

    pub fn returning(mut self, cols: impl IntoIterator<Item = impl Into<ColumnName>>) -> Self {
        self.returning.extend(cols.into_iter().map(Into::into));
        self
    }
}

impl UpdateStmt {
    pub fn new(table: impl Into<TableName>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            where_: None,
        }
    }

    pub fn set(mut self, column: impl Into<ColumnName>, value: Expr) -> Self {
        self.assignments.push(UpdateAssignment::new(column, value));
        self
    }

    pub fn where_(mut self, expr: Expr) -> Self {
        self.where_ = Some(expr);
        self
    }

    pub fn and_where(mut self, expr: Expr) -> Self {
        self.where_ = Some(match self.where_ {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }
}

impl DeleteStmt {
    pub fn new(table: impl Into<TableName>) -> Self {
        Self {
            table: table.into(),
            where_: None,
        }
    }

    pub fn where_(mut self, expr: Expr) -> Self {
        self.where_ = Some(expr);
        self
    }

    pub fn and_where(mut self, expr: Expr) -> Self {
        self.where_ = Some(match self.where_ {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }
}
