//! Column options and runtime report columns.

use inflector::Inflector;
use serde::{Deserialize, Serialize};

use crate::display::DisplayFn;
use crate::sql::{func, lit_int, BinaryOperator, Expr, ExprExt};

/// An aggregate an administrator can apply to an eligible column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub fn apply(&self, expr: Expr) -> Expr {
        match self {
            Aggregate::Count => func("COUNT", vec![expr]),
            Aggregate::CountDistinct => Expr::Function {
                name: "COUNT".into(),
                args: vec![expr],
                distinct: true,
            },
            Aggregate::Sum => func("SUM", vec![expr]),
            Aggregate::Avg => func("AVG", vec![expr]),
            Aggregate::Min => func("MIN", vec![expr]),
            Aggregate::Max => func("MAX", vec![expr]),
        }
    }
}

/// A date transform an administrator can apply to an eligible column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Day,
    Month,
    Quarter,
    Year,
    YearMonth,
}

impl Transform {
    /// Bucket an epoch-seconds expression. Dates are stored as Unix
    /// timestamps, so transforms go through STRFTIME with the
    /// 'unixepoch' modifier rather than a date-typed truncation.
    pub fn apply(&self, expr: Expr) -> Expr {
        let strftime = |format: &str, expr: Expr| {
            func(
                "STRFTIME",
                vec![
                    crate::sql::lit_str(format),
                    expr,
                    crate::sql::lit_str("unixepoch"),
                ],
            )
        };
        match self {
            Transform::Day => strftime("%Y-%m-%d", expr),
            Transform::Month => strftime("%m", expr),
            // STRFTIME has no quarter format; derive it from the month.
            Transform::Quarter => strftime("%m", expr)
                .binop(BinaryOperator::Plus, lit_int(2))
                .paren()
                .binop(BinaryOperator::Divide, lit_int(3)),
            Transform::Year => strftime("%Y", expr),
            Transform::YearMonth => strftime("%Y-%m", expr),
        }
    }
}

/// An addressable column an administrator can add to a report.
///
/// Options are immutable after source construction; the `(type, value)`
/// pair is the key reports reference them by, and `{type}_{value}` is
/// the alias the composed query selects them under.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnOption {
    col_type: String,
    value: String,
    expr: Expr,
    joins: Vec<String>,
    display: DisplayFn,
    heading: String,
    capability: Option<String>,
    groupable: bool,
    aggregations: bool,
    transforms: bool,
    exportable: bool,
}

impl ColumnOption {
    pub fn new(col_type: &str, value: &str, expr: Expr) -> Self {
        Self {
            col_type: col_type.into(),
            value: value.into(),
            expr,
            joins: Vec::new(),
            display: DisplayFn::Plain,
            heading: value.to_title_case(),
            capability: None,
            groupable: true,
            aggregations: false,
            transforms: false,
            exportable: true,
        }
    }

    pub fn joins(mut self, joins: &[&str]) -> Self {
        self.joins = joins.iter().map(|j| j.to_string()).collect();
        self
    }

    pub fn display(mut self, display: DisplayFn) -> Self {
        self.display = display;
        self
    }

    pub fn heading(mut self, heading: &str) -> Self {
        self.heading = heading.into();
        self
    }

    /// Viewing this column requires a capability. Enforcement belongs
    /// to the caller's permission layer; the engine only records it.
    pub fn capability(mut self, capability: &str) -> Self {
        self.capability = Some(capability.into());
        self
    }

    pub fn not_groupable(mut self) -> Self {
        self.groupable = false;
        self
    }

    pub fn aggregatable(mut self) -> Self {
        self.aggregations = true;
        self
    }

    pub fn transformable(mut self) -> Self {
        self.transforms = true;
        self
    }

    pub fn not_exportable(mut self) -> Self {
        self.exportable = false;
        self
    }

    // --- accessors ---

    pub fn key(&self) -> (String, String) {
        (self.col_type.clone(), self.value.clone())
    }

    pub fn key_string(&self) -> String {
        format!("{}-{}", self.col_type, self.value)
    }

    /// The alias this option's expression is selected under.
    pub fn field_alias(&self) -> String {
        format!("{}_{}", self.col_type, self.value)
    }

    pub fn col_type(&self) -> &str {
        &self.col_type
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn required_joins(&self) -> &[String] {
        &self.joins
    }

    pub fn display_fn(&self) -> DisplayFn {
        self.display
    }

    pub fn default_heading(&self) -> &str {
        &self.heading
    }

    pub fn required_capability(&self) -> Option<&str> {
        self.capability.as_deref()
    }

    pub fn is_groupable(&self) -> bool {
        self.groupable
    }

    pub fn allows_aggregation(&self) -> bool {
        self.aggregations
    }

    pub fn allows_transforms(&self) -> bool {
        self.transforms
    }

    pub fn is_exportable(&self) -> bool {
        self.exportable
    }
}

/// A column as configured on a particular report.
///
/// Materialized from a `ColumnOption` by
/// `ReportSource::new_column_from_option`; persisted as report
/// configuration and re-materialized when the report runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportColumn {
    pub col_type: String,
    pub value: String,
    pub heading: String,
    pub transform: Option<Transform>,
    pub aggregate: Option<Aggregate>,
    pub hidden: bool,
}

impl ReportColumn {
    /// The `{type}_{value}` field this column reads from a result row.
    pub fn field_alias(&self) -> String {
        format!("{}_{}", self.col_type, self.value)
    }
}
