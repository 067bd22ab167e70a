//! Expression AST - the core of SQL expression building.
//!
//! Every variant must be handled in `to_sql()` - the compiler enforces
//! exhaustive matching when new variants are added.

use std::collections::BTreeSet;

use super::query::SelectQuery;
use super::writer::{Param, SqlWriter};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: optional_table.column
    Column {
        table: Option<String>,
        column: String,
    },

    /// Literal values, rendered as bind parameters (except NULL)
    Literal(Literal),

    /// Binary operation: left op right
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Unary operation: op expr
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },

    /// Function call: name(args...)
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },

    /// COUNT(*)
    CountStar,

    /// CASE WHEN... THEN... ELSE... END
    Case {
        operand: Option<Box<Expr>>,
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Option<Box<Expr>>,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// IN: expr IN (values...)
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// BETWEEN: expr BETWEEN low AND high
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },

    /// LIKE: expr LIKE pattern
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },

    /// Parenthesized expression
    Paren(Box<Expr>),

    /// Scalar subquery: (SELECT ...)
    Subquery(Box<SelectQuery>),
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // Arithmetic
    Plus,
    Minus,
    Multiply,
    Divide,
    // String
    Concat,
}

impl BinaryOperator {
    fn as_sql(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Gte => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Concat => "||",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Neg,
}

impl Expr {
    /// Serialize into a writer.
    pub fn to_sql(&self, w: &mut SqlWriter) {
        match self {
            Expr::Column { table, column } => {
                w.column(table.as_deref(), column);
            }
            Expr::Literal(lit) => match lit {
                Literal::Int(n) => {
                    w.param(Param::Int(*n));
                }
                Literal::Float(f) => {
                    w.param(Param::Float(*f));
                }
                Literal::String(s) => {
                    w.param(Param::Str(s.clone()));
                }
                Literal::Bool(b) => {
                    w.param(Param::Bool(*b));
                }
                Literal::Null => {
                    w.push("NULL");
                }
            },
            Expr::BinaryOp { left, op, right } => {
                left.to_sql(w);
                w.push(" ").push(op.as_sql()).push(" ");
                right.to_sql(w);
            }
            Expr::UnaryOp { op, expr } => {
                match op {
                    UnaryOperator::Not => w.push("NOT "),
                    UnaryOperator::Neg => w.push("-"),
                };
                expr.to_sql(w);
            }
            Expr::Function {
                name,
                args,
                distinct,
            } => {
                w.push(name).push("(");
                if *distinct {
                    w.push("DISTINCT ");
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    arg.to_sql(w);
                }
                w.push(")");
            }
            Expr::CountStar => {
                w.push("COUNT(*)");
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                w.push("CASE");
                if let Some(operand) = operand {
                    w.push(" ");
                    operand.to_sql(w);
                }
                for (when, then) in when_clauses {
                    w.push(" WHEN ");
                    when.to_sql(w);
                    w.push(" THEN ");
                    then.to_sql(w);
                }
                if let Some(else_clause) = else_clause {
                    w.push(" ELSE ");
                    else_clause.to_sql(w);
                }
                w.push(" END");
            }
            Expr::IsNull { expr, negated } => {
                expr.to_sql(w);
                w.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Expr::In {
                expr,
                values,
                negated,
            } => {
                // An empty IN list is a syntax error; it matches nothing
                // (or everything when negated).
                if values.is_empty() {
                    w.push(if *negated { "TRUE" } else { "FALSE" });
                    return;
                }
                expr.to_sql(w);
                w.push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    value.to_sql(w);
                }
                w.push(")");
            }
            Expr::Between { expr, low, high } => {
                expr.to_sql(w);
                w.push(" BETWEEN ");
                low.to_sql(w);
                w.push(" AND ");
                high.to_sql(w);
            }
            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                expr.to_sql(w);
                w.push(if *negated { " NOT LIKE " } else { " LIKE " });
                pattern.to_sql(w);
            }
            Expr::Paren(inner) => {
                w.push("(");
                inner.to_sql(w);
                w.push(")");
            }
            Expr::Subquery(query) => {
                w.push("(");
                query.to_sql(w);
                w.push(")");
            }
        }
    }

    /// Collect every table qualifier referenced by this expression.
    ///
    /// Used to check the column invariant: an option's expression may
    /// only reference tables named in its join list (or `base`).
    pub fn referenced_tables(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Column { table, .. } => {
                if let Some(table) = table {
                    out.insert(table.clone());
                }
            }
            Expr::Literal(_) | Expr::CountStar => {}
            Expr::BinaryOp { left, right, .. } => {
                left.referenced_tables(out);
                right.referenced_tables(out);
            }
            Expr::UnaryOp { expr, .. } => expr.referenced_tables(out),
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.referenced_tables(out);
                }
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                if let Some(operand) = operand {
                    operand.referenced_tables(out);
                }
                for (when, then) in when_clauses {
                    when.referenced_tables(out);
                    then.referenced_tables(out);
                }
                if let Some(else_clause) = else_clause {
                    else_clause.referenced_tables(out);
                }
            }
            Expr::IsNull { expr, .. } => expr.referenced_tables(out),
            Expr::In { expr, values, .. } => {
                expr.referenced_tables(out);
                for value in values {
                    value.referenced_tables(out);
                }
            }
            Expr::Between { expr, low, high } => {
                expr.referenced_tables(out);
                low.referenced_tables(out);
                high.referenced_tables(out);
            }
            Expr::Like { expr, pattern, .. } => {
                expr.referenced_tables(out);
                pattern.referenced_tables(out);
            }
            Expr::Paren(inner) => inner.referenced_tables(out),
            // Subqueries have their own scope; their table references
            // are not the outer query's concern.
            Expr::Subquery(_) => {}
        }
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Unqualified column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        column: name.into(),
    }
}

/// Table-qualified column reference.
pub fn qcol(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

pub fn lit_float(f: f64) -> Expr {
    Expr::Literal(Literal::Float(f))
}

pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

pub fn lit_bool(b: bool) -> Expr {
    Expr::Literal(Literal::Bool(b))
}

pub fn lit_null() -> Expr {
    Expr::Literal(Literal::Null)
}

/// Generic function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
        distinct: false,
    }
}

pub fn coalesce(args: Vec<Expr>) -> Expr {
    func("COALESCE", args)
}

// =============================================================================
// Combinators
// =============================================================================

/// Fluent combinators for building expressions.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn eq(self, other: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Eq, other)
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Ne, other)
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Gte, other)
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Lte, other)
    }

    fn and(self, other: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::And, other)
    }

    fn or(self, other: impl Into<Expr>) -> Expr {
        self.binop(BinaryOperator::Or, other)
    }

    fn like(self, pattern: impl Into<Expr>) -> Expr {
        Expr::Like {
            expr: Box::new(self.into_expr()),
            pattern: Box::new(pattern.into()),
            negated: false,
        }
    }

    fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: false,
        }
    }

    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: true,
        }
    }

    fn between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> Expr {
        Expr::Between {
            expr: Box::new(self.into_expr()),
            low: Box::new(low.into()),
            high: Box::new(high.into()),
        }
    }

    fn paren(self) -> Expr {
        Expr::Paren(Box::new(self.into_expr()))
    }

    fn binop(self, op: BinaryOperator, other: impl Into<Expr>) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self.into_expr()),
            op,
            right: Box::new(other.into()),
        }
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}
