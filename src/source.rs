//! Report sources: the composed whole.
//!
//! A `SourceBuilder` accumulates joins, column options and filter
//! options (hand-registered and custom-field-injected alike) and
//! `build()` runs every construction-time validation eagerly, so a
//! misconfigured source fails before any report can reference it.

use crate::catalog::{
    Aggregate, ColumnOption, FilterInput, FilterOption, OptionCatalog, ReportColumn, Transform,
};
use crate::customfield::{inject_custom_fields, Entity, FieldCatalog};
use crate::display::{self, ExportFormat, Row};
use crate::error::{SourceError, SourceResult};
use crate::join::{JoinGraph, JoinSpec, BASE};
use crate::sql::{Expr, SelectExpr, SelectQuery, TableExpr};

/// A filter applied to a particular report run.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedFilter {
    pub col_type: String,
    pub value: String,
    pub input: FilterInput,
}

/// Builder for a `ReportSource`.
#[derive(Debug)]
#[must_use = "builders have no effect until built"]
pub struct SourceBuilder {
    base_table: TableExpr,
    joins: Vec<JoinSpec>,
    columns: Vec<ColumnOption>,
    filters: Vec<FilterOption>,
}

impl SourceBuilder {
    /// Start a source over `base_table`, aliased `base` in the
    /// composed query.
    pub fn new(base_table: TableExpr) -> Self {
        Self {
            base_table,
            joins: Vec::new(),
            columns: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn with_join(mut self, join: JoinSpec) -> Self {
        self.joins.push(join);
        self
    }

    pub fn with_column(mut self, column: ColumnOption) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_filter(mut self, filter: FilterOption) -> Self {
        self.filters.push(filter);
        self
    }

    /// Scan `entity`'s custom field catalog and register the resulting
    /// joins, columns and filters. Returns whether anything was added.
    pub fn inject_custom_fields(
        &mut self,
        catalog: &dyn FieldCatalog,
        entity: Entity,
        join_name: &str,
        join_key: &str,
    ) -> SourceResult<bool> {
        inject_custom_fields(
            catalog,
            entity,
            join_name,
            join_key,
            &mut self.joins,
            &mut self.columns,
            &mut self.filters,
        )
    }

    /// Validate everything and seal the source.
    pub fn build(self) -> SourceResult<ReportSource> {
        let graph = JoinGraph::build(self.joins)?;
        let catalog = OptionCatalog::build(self.columns, self.filters)?;
        Ok(ReportSource {
            base_table: self.base_table,
            graph,
            catalog,
        })
    }
}

/// A fully validated report source: base table, join graph, option
/// catalog. Immutable once built; shared freely within a request.
#[derive(Debug, Clone)]
pub struct ReportSource {
    base_table: TableExpr,
    graph: JoinGraph,
    catalog: OptionCatalog,
}

impl ReportSource {
    pub fn joins(&self) -> &JoinGraph {
        &self.graph
    }

    pub fn catalog(&self) -> &OptionCatalog {
        &self.catalog
    }

    pub fn resolve_column(&self, col_type: &str, value: &str) -> SourceResult<&ColumnOption> {
        self.catalog.resolve_column(col_type, value)
    }

    pub fn resolve_filter(&self, col_type: &str, value: &str) -> SourceResult<&FilterOption> {
        self.catalog.resolve_filter(col_type, value)
    }

    /// Materialize a report column from a registered option.
    ///
    /// Verifies the option exists, its joins are all registered, and
    /// any requested transform/aggregate is allowed on it. Falls back
    /// to the option's registered heading when none is supplied.
    pub fn new_column_from_option(
        &self,
        col_type: &str,
        value: &str,
        transform: Option<Transform>,
        aggregate: Option<Aggregate>,
        heading: Option<&str>,
        hidden: bool,
    ) -> SourceResult<ReportColumn> {
        let option = self.catalog.resolve_column(col_type, value)?;
        let missing: Vec<String> = option
            .required_joins()
            .iter()
            .filter(|join| !self.graph.contains(join))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(SourceError::JoinsNotSatisfied {
                column: option.key_string(),
                missing,
            });
        }
        if transform.is_some() && !option.allows_transforms() {
            return Err(SourceError::TransformNotSupported {
                column: option.key_string(),
            });
        }
        if aggregate.is_some() && !option.allows_aggregation() {
            return Err(SourceError::AggregateNotSupported {
                column: option.key_string(),
            });
        }
        Ok(ReportColumn {
            col_type: col_type.to_string(),
            value: value.to_string(),
            heading: heading.unwrap_or(option.default_heading()).to_string(),
            transform,
            aggregate,
            hidden,
        })
    }

    /// Compose the SQL query for a configured column list plus any
    /// applied filters.
    ///
    /// Each column is selected under its `{type}_{value}` alias;
    /// required joins (and their transitive dependencies) are emitted
    /// in topological order; when any column aggregates, the remaining
    /// columns are grouped by.
    pub fn compose(
        &self,
        columns: &[ReportColumn],
        applied: &[AppliedFilter],
    ) -> SourceResult<SelectQuery> {
        let mut required: Vec<String> = Vec::new();
        let mut select_items: Vec<(SelectExpr, Option<Expr>)> = Vec::new();
        let aggregated = columns.iter().any(|column| column.aggregate.is_some());

        for column in columns {
            let option = self.catalog.resolve_column(&column.col_type, &column.value)?;
            required.extend(option.required_joins().iter().cloned());

            let mut expr = option.expr().clone();
            if let Some(transform) = column.transform {
                if !option.allows_transforms() {
                    return Err(SourceError::TransformNotSupported {
                        column: option.key_string(),
                    });
                }
                expr = transform.apply(expr);
            }
            let group_expr = match column.aggregate {
                Some(aggregate) => {
                    if !option.allows_aggregation() {
                        return Err(SourceError::AggregateNotSupported {
                            column: option.key_string(),
                        });
                    }
                    expr = aggregate.apply(expr);
                    None
                }
                None => Some(expr.clone()),
            };
            select_items.push((
                SelectExpr::new(expr).with_alias(&column.field_alias()),
                group_expr,
            ));
        }

        let mut predicates: Vec<Expr> = Vec::new();
        for filter in applied {
            let option = self.catalog.resolve_filter(&filter.col_type, &filter.value)?;
            let target = match option.expr() {
                Some(expr) => {
                    required.extend(option.required_joins().iter().cloned());
                    expr.clone()
                }
                None => {
                    let column = self
                        .catalog
                        .resolve_column(&filter.col_type, &filter.value)?;
                    required.extend(column.required_joins().iter().cloned());
                    column.expr().clone()
                }
            };
            if let Some(predicate) = option.condition(&target, &filter.input) {
                predicates.push(predicate);
            }
        }

        let mut query = SelectQuery::new().from(self.base_table.clone(), BASE);
        for (item, _) in &select_items {
            query = query.select(item.clone());
        }
        for spec in self.graph.ordered_subset(&required)? {
            query = query.join(
                spec.join_type(),
                spec.table().clone(),
                spec.name(),
                spec.on().clone(),
            );
        }
        for predicate in predicates {
            query = query.filter(predicate);
        }
        if aggregated {
            for (_, group_expr) in select_items {
                if let Some(expr) = group_expr {
                    query = query.group_by(expr);
                }
            }
        }
        Ok(query)
    }

    /// Format one result row for display. Never fails; see
    /// `display::format_row`.
    pub fn format_row(
        &self,
        row: &Row,
        columns: &[ReportColumn],
        format: ExportFormat,
    ) -> Vec<String> {
        display::format_row(row, columns, &self.catalog, format)
    }
}
