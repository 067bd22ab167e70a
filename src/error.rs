//! Unified error types for report source composition.
//!
//! Every variant here is raised eagerly while a source is being
//! constructed or a report column is being materialized. Once a
//! `ReportSource` exists, row formatting never fails; stale
//! configuration degrades to placeholder output instead.

use thiserror::Error;

/// Result type for source composition operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors that can occur while composing a report source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// Two join specs share the same name.
    #[error("Duplicate join name: '{0}'")]
    DuplicateJoinName(String),

    /// A join name collides with a SQL reserved word.
    #[error("Join name '{0}' is a SQL reserved word")]
    ReservedWordConflict(String),

    /// A join name is not a valid lowercase identifier.
    #[error("Join name '{0}' is not a valid identifier")]
    InvalidJoinName(String),

    /// A join declares a dependency that no registered join provides.
    #[error("Join '{join}' depends on '{dependency}', which is not registered")]
    MissingDependency { join: String, dependency: String },

    /// The join dependency graph contains a cycle.
    #[error("Join dependency cycle: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    /// No column option registered under (type, value).
    #[error("No column option '{col_type}-{value}'")]
    ColumnOptionNotFound { col_type: String, value: String },

    /// No filter option registered under (type, value).
    #[error("No filter option '{col_type}-{value}'")]
    FilterOptionNotFound { col_type: String, value: String },

    /// A column option requires joins that are not registered.
    #[error("Column '{column}' requires missing joins: {}", .missing.join(", "))]
    JoinsNotSatisfied { column: String, missing: Vec<String> },

    /// An option's expression references a table outside its join list.
    #[error("Option '{column}' references table '{table}' outside its join list")]
    ExpressionJoinMismatch { column: String, table: String },

    /// A filter has neither a matching column option nor its own predicate.
    #[error("Filter '{col_type}-{value}' has no matching column and no predicate of its own")]
    FilterWithoutColumn { col_type: String, value: String },

    /// A transform was requested on a column that does not allow them.
    #[error("Column '{column}' does not support transforms")]
    TransformNotSupported { column: String },

    /// An aggregate was requested on a column that does not allow them.
    #[error("Column '{column}' does not support aggregation")]
    AggregateNotSupported { column: String },

    /// The custom field catalog could not be read.
    #[error("Field catalog error: {0}")]
    Metadata(String),
}
