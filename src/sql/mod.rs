//! Typed SQL fragments.
//!
//! Joins, column expressions and filter predicates are represented as a
//! small AST and rendered to parameterized SQL. User-influenced values
//! (defaults, filter inputs, field ids) only ever enter the output as
//! bind parameters, never as interpolated text.

pub mod expr;
pub mod query;
pub mod writer;

pub use expr::{
    coalesce, col, func, lit_bool, lit_float, lit_int, lit_null, lit_str, qcol, BinaryOperator,
    Expr, ExprExt, Literal, UnaryOperator,
};
pub use query::{JoinClause, JoinType, SelectExpr, SelectQuery, TableExpr};
pub use writer::{Param, SqlWriter};
