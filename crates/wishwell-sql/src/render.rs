//! Render SQL AST to string.
//!
//! Rendering is dialect-driven: placeholder style, identifier quoting and
//! the upsert clause shape all come from the [`Dialect`] carried by the
//! [`RenderContext`]. Parameter indices are assigned in the order the
//! placeholders appear in the output, left to right.

use std::cell::RefCell;
use std::fmt;

use indexmap::IndexMap;

use crate::expr::{ColumnRef, Expr};
use crate::stmt::*;
use crate::{Dialect, ParamName, RenderedSql, escape_string};

/// Mutable parameter tracking state.
struct ParamState {
    /// Named parameters -> their assigned index (numbered dialects).
    named: IndexMap<ParamName, usize>,
    /// One entry per placeholder occurrence (positional dialects).
    ordered: Vec<ParamName>,
    /// Next parameter index to assign.
    next_param_idx: usize,
}

impl ParamState {
    fn new() -> Self {
        Self {
            named: IndexMap::new(),
            ordered: Vec::new(),
            next_param_idx: 1,
        }
    }
}

/// Rendering context carrying the dialect and parameter state.
pub struct RenderContext {
    dialect: Dialect,
    params: RefCell<ParamState>,
}

impl RenderContext {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            params: RefCell::new(ParamState::new()),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Quote an identifier for the current dialect.
    fn ident(&self, name: &str) -> String {
        self.dialect.quote_ident(name)
    }

    /// Produce the placeholder token for a named parameter.
    ///
    /// Numbered dialects reuse the index assigned at the parameter's first
    /// occurrence; positional dialects record every occurrence.
    fn placeholder(&self, name: &ParamName) -> String {
        let mut state = self.params.borrow_mut();
        if self.dialect.numbered_params() {
            let ParamState {
                named,
                next_param_idx,
                ..
            } = &mut *state;
            let idx = *named.entry(name.clone()).or_insert_with(|| {
                let idx = *next_param_idx;
                *next_param_idx += 1;
                idx
            });
            self.dialect.placeholder(idx)
        } else {
            state.ordered.push(name.clone());
            let idx = state.ordered.len();
            self.dialect.placeholder(idx)
        }
    }

    /// Finish rendering and return the collected params in placeholder order.
    fn into_params(self) -> Vec<ParamName> {
        let state = self.params.into_inner();
        if self.dialect.numbered_params() {
            state.named.into_keys().collect()
        } else {
            state.ordered
        }
    }
}

/// Wrapper for rendering a value via Display.
struct Fmt<'a, T: Render + ?Sized>(&'a RenderContext, &'a T);

impl<T: Render + ?Sized> fmt::Display for Fmt<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.1.render(self.0, f)
    }
}

// ============================================================================
// Render implementations
// ============================================================================

/// Trait for types that can be rendered to SQL.
pub trait Render {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl Render for Expr {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Param(name) => {
                let ph = ctx.placeholder(name);
                write!(f, "{ph}")
            }
            Expr::Column(col) => col.render(ctx, f),
            Expr::String(s) => {
                let escaped = escape_string(s);
                write!(f, "{escaped}")
            }
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Expr::Null => write!(f, "NULL"),
            Expr::BinOp { left, op, right } => {
                let left = Fmt(ctx, left.as_ref());
                let right = Fmt(ctx, right.as_ref());
                let op_str = op.as_str();
                // OR is parenthesized so it composes with surrounding ANDs.
                if matches!(op, crate::BinOp::Or) {
                    write!(f, "({left} {op_str} {right})")
                } else {
                    write!(f, "{left} {op_str} {right}")
                }
            }
            Expr::IsNull { expr, negated } => {
                let expr = Fmt(ctx, expr.as_ref());
                let suffix = if *negated { " IS NOT NULL" } else { " IS NULL" };
                write!(f, "{expr}{suffix}")
            }
            Expr::In { expr, list } => {
                let expr = Fmt(ctx, expr.as_ref());
                write!(f, "{expr} IN (")?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", Fmt(ctx, item))?;
                }
                write!(f, ")")
            }
            Expr::FnCall { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", Fmt(ctx, arg))?;
                }
                write!(f, ")")
            }
            Expr::Greatest(args) => {
                write!(f, "{}(", ctx.dialect().greatest_fn())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", Fmt(ctx, arg))?;
                }
                write!(f, ")")
            }
            Expr::Excluded(column) => {
                let col = ctx.ident(column);
                match ctx.dialect() {
                    Dialect::Postgres => write!(f, "EXCLUDED.{col}"),
                    Dialect::Sqlite => write!(f, "excluded.{col}"),
                    Dialect::MySql => write!(f, "VALUES({col})"),
                }
            }
            Expr::Subquery(stmt) => {
                write!(f, "({})", Fmt(ctx, stmt.as_ref()))
            }
            Expr::Raw(s) => write!(f, "{s}"),
        }
    }
}

impl Render for ColumnRef {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            let table = ctx.ident(table);
            write!(f, "{table}.")?;
        }
        let column = ctx.ident(&self.column);
        write!(f, "{column}")
    }
}

impl Render for SelectStmt {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT")?;

        if self.distinct {
            write!(f, " DISTINCT")?;
        }

        // Columns
        if self.columns.is_empty() {
            write!(f, " *")?;
        } else {
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, " {}", Fmt(ctx, col))?;
            }
        }

        // FROM
        if let Some(from) = &self.from {
            let table = ctx.ident(&from.table);
            write!(f, " FROM {table}")?;
            if let Some(alias) = &from.alias {
                let alias = ctx.ident(alias);
                write!(f, " {alias}")?;
            }
        }

        // JOINs
        for join in &self.joins {
            let kind = join.kind.as_str();
            let table = ctx.ident(&join.table);
            write!(f, " {kind} {table}")?;
            if let Some(alias) = &join.alias {
                let alias = ctx.ident(alias);
                write!(f, " {alias}")?;
            }
            let on = Fmt(ctx, &join.on);
            write!(f, " ON {on}")?;
        }

        // WHERE
        if let Some(where_) = &self.where_ {
            let where_ = Fmt(ctx, where_);
            write!(f, " WHERE {where_}")?;
        }

        // GROUP BY
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY ")?;
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", Fmt(ctx, expr))?;
            }
        }

        // HAVING
        if let Some(having) = &self.having {
            let having = Fmt(ctx, having);
            write!(f, " HAVING {having}")?;
        }

        // ORDER BY
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY ")?;
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                let expr = Fmt(ctx, &order.expr);
                let dir = if order.desc { " DESC" } else { " ASC" };
                write!(f, "{expr}{dir}")?;
            }
        }

        // LIMIT
        if let Some(limit) = &self.limit {
            let limit = Fmt(ctx, limit);
            write!(f, " LIMIT {limit}")?;
        }

        // OFFSET
        if let Some(offset) = &self.offset {
            let offset = Fmt(ctx, offset);
            write!(f, " OFFSET {offset}")?;
        }

        Ok(())
    }
}

impl Render for SelectColumn {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectColumn::Expr { expr, alias } => {
                let expr = Fmt(ctx, expr);
                write!(f, "{expr}")?;
                if let Some(alias) = alias {
                    let alias = ctx.ident(alias);
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
            SelectColumn::AllFrom(table) => {
                let table = ctx.ident(table);
                write!(f, "{table}.*")
            }
        }
    }
}

impl Render for InsertStmt {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = ctx.ident(&self.table);
        write!(f, "INSERT INTO {table} (")?;

        // Columns
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let col = ctx.ident(col);
            write!(f, "{col}")?;
        }
        write!(f, ")")?;

        // VALUES
        write!(f, " VALUES (")?;
        for (i, val) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", Fmt(ctx, val))?;
        }
        write!(f, ")")?;

        // Conflict clause
        if let Some(conflict) = &self.on_conflict {
            match ctx.dialect() {
                Dialect::Postgres | Dialect::Sqlite => {
                    write!(f, " ON CONFLICT (")?;
                    for (i, col) in conflict.columns.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        let col = ctx.ident(col);
                        write!(f, "{col}")?;
                    }
                    write!(f, ")")?;

                    match &conflict.action {
                        ConflictAction::DoNothing => {
                            write!(f, " DO NOTHING")?;
                        }
                        ConflictAction::DoUpdate(assignments) => {
                            write!(f, " DO UPDATE SET ")?;
                            render_assignments(ctx, f, assignments)?;
                        }
                    }
                }
                Dialect::MySql => {
                    // The conflict target is implied by the table's unique
                    // keys; DO NOTHING becomes a self-assignment of the
                    // first target column.
                    write!(f, " ON DUPLICATE KEY UPDATE ")?;
                    match &conflict.action {
                        ConflictAction::DoNothing => {
                            let col = conflict
                                .columns
                                .first()
                                .map(|c| ctx.ident(c))
                                .unwrap_or_else(|| ctx.ident("id"));
                            write!(f, "{col} = {col}")?;
                        }
                        ConflictAction::DoUpdate(assignments) => {
                            render_assignments(ctx, f, assignments)?;
                        }
                    }
                }
            }
        }

        // RETURNING (only where the dialect has it)
        if !self.returning.is_empty() && ctx.dialect().supports_returning() {
            write!(f, " RETURNING ")?;
            for (i, col) in self.returning.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                let col = ctx.ident(col);
                write!(f, "{col}")?;
            }
        }

        Ok(())
    }
}

fn render_assignments(
    ctx: &RenderContext,
    f: &mut fmt::Formatter<'_>,
    assignments: &[UpdateAssignment],
) -> fmt::Result {
    for (i, assign) in assignments.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        let col = ctx.ident(&assign.column);
        let val = Fmt(ctx, &assign.value);
        write!(f, "{col} = {val}")?;
    }
    Ok(())
}

impl Render for UpdateStmt {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = ctx.ident(&self.table);
        write!(f, "UPDATE {table} SET ")?;
        render_assignments(ctx, f, &self.assignments)?;

        if let Some(where_) = &self.where_ {
            let where_ = Fmt(ctx, where_);
            write!(f, " WHERE {where_}")?;
        }

        Ok(())
    }
}

impl Render for DeleteStmt {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = ctx.ident(&self.table);
        write!(f, "DELETE FROM {table}")?;

        if let Some(where_) = &self.where_ {
            let where_ = Fmt(ctx, where_);
            write!(f, " WHERE {where_}")?;
        }

        Ok(())
    }
}

impl Render for Stmt {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Select(s) => s.render(ctx, f),
            Stmt::Insert(s) => s.render(ctx, f),
            Stmt::Update(s) => s.render(ctx, f),
            Stmt::Delete(s) => s.render(ctx, f),
        }
    }
}

// ============================================================================
// Convenience entry point
// ============================================================================

/// Render a statement for a dialect.
pub fn render(dialect: Dialect, stmt: &impl Render) -> RenderedSql {
    let ctx = RenderContext::new(dialect);
    let sql = format!("{}", Fmt(&ctx, stmt));
    RenderedSql {
        sql,
        params: ctx.into_params(),
    }
}

// ============================================================================
// Tests
// ============================================================================
