//! # reportsource
//!
//! A report source composition engine.
//!
//! A *source* declares the tables a report can reach (named join
//! fragments with dependencies), the columns and filters an
//! administrator can pick from, and how raw result values render. The
//! engine validates the whole configuration eagerly, injects custom
//! field metadata per entity, and compiles a configured report into one
//! parameterized SQL query.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │   SourceBuilder (joins, columns, filters, custom fields) │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [build: validate everything]
//! ┌─────────────────────────────────────────────────────────┐
//! │     ReportSource (JoinGraph + OptionCatalog, sealed)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compose]
//! ┌─────────────────────────────────────────────────────────┐
//! │        SelectQuery → parameterized SQL + params          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [format_row]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Rendered cells per row                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Sources are request-scoped and single-threaded: construct, compose,
//! execute, format. Nothing here is shared or mutated after `build()`.

pub mod catalog;
pub mod customfield;
pub mod display;
pub mod error;
pub mod join;
pub mod source;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{
        Aggregate, ColumnOption, FilterChoices, FilterInput, FilterOption, FilterWidget,
        OptionCatalog, ReportColumn, Transform,
    };
    pub use crate::customfield::{
        choice_key, Entity, FieldCatalog, FieldDefinition, FieldType,
    };
    pub use crate::display::{DisplayFn, ExportFormat, Row, UNKNOWN};
    pub use crate::error::{SourceError, SourceResult};
    pub use crate::join::{JoinGraph, JoinSpec, BASE};
    pub use crate::source::{AppliedFilter, ReportSource, SourceBuilder};
    pub use crate::sql::{
        coalesce, col, func, lit_bool, lit_float, lit_int, lit_null, lit_str, qcol, Expr, ExprExt,
        JoinType, Param, SelectExpr, SelectQuery, TableExpr,
    };
}
