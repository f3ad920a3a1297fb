//! SQL expressions.

use crate::{ColumnName, ParamName, TableName};

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A named parameter placeholder (rendered as `$n` or `?`)
    Param(ParamName),
    /// A column reference
    Column(ColumnRef),
    /// A string literal
    String(String),
    /// An integer literal
    Int(i64),
    /// A boolean literal
    Bool(bool),
    /// NULL
    Null,
    /// Binary operation (e.g., a = b, a AND b)
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },
    /// Membership in a value list: `expr IN (a, b, …)`. The list must be
    /// non-empty; callers guard against rendering an empty IN.
    In { expr: Box<Expr>, list: Vec<Expr> },
    /// Function call
    FnCall { name: String, args: Vec<Expr> },
    /// Max-of-two-or-more, rendered with the dialect's function name
    /// (`GREATEST` / `MAX`)
    Greatest(Vec<Expr>),
    /// The incoming row inside an upsert UPDATE clause: `EXCLUDED.col`,
    /// `excluded.col` or `VALUES(col)` depending on dialect
    Excluded(ColumnName),
    /// A scalar subquery, rendered parenthesized
    Subquery(Box<crate::stmt::SelectStmt>),
    /// Raw SQL (escape hatch; carries no parameters)
    Raw(String),
}

/// A column reference, optionally qualified with table/alias.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: Option<TableName>,
    pub column: ColumnName,
}

impl ColumnRef {
    pub fn new(column: ColumnName) -> Self {
        Self {
            table: None,
            column,
        }
    }

    pub fn qualified(table: TableName, column: ColumnName) -> Self {
        Self {
            table: Some(table),
            column,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    And,
    Or,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Eq => "=",
            BinOp::Ne => "<>",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::And => "AND",
            BinOp::Or => "OR",
        }
    }
}

// Convenience constructors
impl Expr {
    pub fn param(name: impl Into<ParamName>) -> Self {
        Expr::Param(name.into())
    }

    pub fn column(name: impl Into<ColumnName>) -> Self {
        Expr::Column(ColumnRef::new(name.into()))
    }

    pub fn qualified_column(table: impl Into<TableName>, column: impl Into<ColumnName>) -> Self {
        Expr::Column(ColumnRef::qualified(table.into(), column.into()))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::String(s.into())
    }

    pub fn int(n: i64) -> Self {
        Expr::Int(n)
    }

    pub fn bool(b: bool) -> Self {
        Expr::Bool(b)
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    fn binop(self, op: BinOp, other: Expr) -> Self {
        Expr::BinOp {
            left: Box::new(self),
            op,
            right: Box::new(other),
        }
    }

    /// Create an equality expression: self = other
    pub fn eq(self, other: Expr) -> Self {
        self.binop(BinOp::Eq, other)
    }

    /// Create an addition expression: self + other
    pub fn add(self, other: Expr) -> Self {
        self.binop(BinOp::Add, other)
    }

    /// Create a subtraction expression: self - other
    pub fn sub(self, other: Expr) -> Self {
        self.binop(BinOp::Sub, other)
    }

    /// Create an AND expression: self AND other
    pub fn and(self, other: Expr) -> Self {
        self.binop(BinOp::And, other)
    }

    /// Create an OR expression: self OR other
    ///
    /// Rendered parenthesized so it composes with surrounding ANDs.
    pub fn or(self, other: Expr) -> Self {
        self.binop(BinOp::Or, other)
    }

    /// Create IS NULL expression
    pub fn is_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// Create IS NOT NULL expression
    pub fn is_not_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    /// Create an IN-list expression: self IN (list…)
    pub fn in_list(self, list: Vec<Expr>) -> Self {
        Expr::In {
            expr: Box::new(self),
            list,
        }
    }

    /// Reference the incoming row of an upsert UPDATE clause.
    pub fn excluded(column: impl Into<ColumnName>) -> Self {
        Expr::Excluded(column.into())
    }
}
