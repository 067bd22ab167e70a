//! Query builder - construct SELECT queries with a fluent API.

use super::expr::{Expr, ExprExt};
use super::writer::{Param, SqlWriter};

// =============================================================================
// Select Expression (column with optional alias)
// =============================================================================

/// A SELECT list item: expression with optional alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_sql(&self, w: &mut SqlWriter) {
        self.expr.to_sql(w);
        if let Some(alias) = &self.alias {
            w.push(" AS ").ident(alias);
        }
    }
}

impl From<Expr> for SelectExpr {
    fn from(expr: Expr) -> Self {
        SelectExpr::new(expr)
    }
}

// =============================================================================
// Table Expression
// =============================================================================

/// A table expression: a named table or a derived table (subquery).
#[derive(Debug, Clone, PartialEq)]
pub enum TableExpr {
    Table {
        schema: Option<String>,
        name: String,
    },
    Derived(Box<SelectQuery>),
}

impl TableExpr {
    pub fn table(name: &str) -> Self {
        TableExpr::Table {
            schema: None,
            name: name.into(),
        }
    }

    pub fn schema_table(schema: &str, name: &str) -> Self {
        TableExpr::Table {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    pub fn derived(query: SelectQuery) -> Self {
        TableExpr::Derived(Box::new(query))
    }

    /// Render followed by an alias, as it appears in FROM/JOIN clauses.
    pub fn to_sql(&self, alias: &str, w: &mut SqlWriter) {
        match self {
            TableExpr::Table { schema, name } => {
                if let Some(schema) = schema {
                    w.ident(schema).push(".");
                }
                w.ident(name);
            }
            TableExpr::Derived(query) => {
                w.push("(");
                query.to_sql(w);
                w.push(")");
            }
        }
        w.push(" ").ident(alias);
    }
}

// =============================================================================
// Joins
// =============================================================================

/// Type of join. Report sources only ever emit inner and left joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: TableExpr,
    pub alias: String,
    pub on: Expr,
}

// =============================================================================
// Select Query
// =============================================================================

/// A SELECT query under construction.
#[derive(Debug, Clone, PartialEq, Default)]
#[must_use = "builders have no effect until used"]
pub struct SelectQuery {
    pub select: Vec<SelectExpr>,
    pub from: Option<(TableExpr, String)>,
    pub joins: Vec<JoinClause>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<(Expr, bool)>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, item: impl Into<SelectExpr>) -> Self {
        self.select.push(item.into());
        self
    }

    pub fn from(mut self, table: TableExpr, alias: &str) -> Self {
        self.from = Some((table, alias.into()));
        self
    }

    pub fn join(mut self, join_type: JoinType, table: TableExpr, alias: &str, on: Expr) -> Self {
        self.joins.push(JoinClause {
            join_type,
            table,
            alias: alias.into(),
            on,
        });
        self
    }

    /// Add a WHERE predicate, AND-combined with any existing one.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(predicate.paren()),
            None => predicate,
        });
        self
    }

    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
        self
    }

    pub fn order_by(mut self, expr: Expr, ascending: bool) -> Self {
        self.order_by.push((expr, ascending));
        self
    }

    pub fn to_sql(&self, w: &mut SqlWriter) {
        w.push("SELECT ");
        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            item.to_sql(w);
        }
        if let Some((table, alias)) = &self.from {
            w.push(" FROM ");
            table.to_sql(alias, w);
        }
        for join in &self.joins {
            w.push(" ").push(join.join_type.as_sql()).push(" ");
            join.table.to_sql(&join.alias, w);
            w.push(" ON ");
            join.on.to_sql(w);
        }
        if let Some(predicate) = &self.where_clause {
            w.push(" WHERE ");
            predicate.to_sql(w);
        }
        if !self.group_by.is_empty() {
            w.push(" GROUP BY ");
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                expr.to_sql(w);
            }
        }
        if !self.order_by.is_empty() {
            w.push(" ORDER BY ");
            for (i, (expr, ascending)) in self.order_by.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                expr.to_sql(w);
                if !ascending {
                    w.push(" DESC");
                }
            }
        }
    }

    /// Render to SQL text plus bind parameters.
    pub fn build(&self) -> (String, Vec<Param>) {
        let mut w = SqlWriter::new();
        self.to_sql(&mut w);
        w.finish()
    }
}
