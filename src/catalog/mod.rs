//! Column and filter option catalogs.
//!
//! Options are the addressable building blocks an administrator picks
//! from when configuring a report. The catalog is append-only while a
//! source is being constructed and sealed (validated) by
//! `OptionCatalog::build`.

mod column;
mod filter;

pub use column::{Aggregate, ColumnOption, ReportColumn, Transform};
pub use filter::{FilterChoices, FilterInput, FilterOption, FilterWidget};

use std::collections::HashMap;

use crate::error::{SourceError, SourceResult};
use crate::join::BASE;

/// The sealed option catalog of a report source.
#[derive(Debug, Clone, Default)]
pub struct OptionCatalog {
    columns: Vec<ColumnOption>,
    filters: Vec<FilterOption>,
    column_index: HashMap<(String, String), usize>,
    filter_index: HashMap<(String, String), usize>,
}

impl OptionCatalog {
    /// Validate and index the registered options.
    ///
    /// Checks the invariants from the data model:
    /// - a column expression may only reference tables named in the
    ///   option's join list (or `base`);
    /// - every filter must target a selectable column of the same
    ///   (type, value), unless it carries its own predicate expression;
    /// - a stand-alone filter predicate may only reference tables named
    ///   in the filter's own join list (or `base`).
    ///
    /// Duplicate keys are a configuration mistake; the last
    /// registration wins, matching how injected options may shadow
    /// hand-registered ones.
    pub fn build(columns: Vec<ColumnOption>, filters: Vec<FilterOption>) -> SourceResult<Self> {
        let mut column_index = HashMap::with_capacity(columns.len());
        for (idx, option) in columns.iter().enumerate() {
            let mut tables = std::collections::BTreeSet::new();
            option.expr().referenced_tables(&mut tables);
            for table in tables {
                if table != BASE && !option.required_joins().contains(&table) {
                    return Err(SourceError::ExpressionJoinMismatch {
                        column: option.key_string(),
                        table,
                    });
                }
            }
            column_index.insert(option.key(), idx);
        }

        let mut filter_index = HashMap::with_capacity(filters.len());
        for (idx, option) in filters.iter().enumerate() {
            match option.expr() {
                None => {
                    if !column_index.contains_key(&option.key()) {
                        return Err(SourceError::FilterWithoutColumn {
                            col_type: option.col_type().to_string(),
                            value: option.value().to_string(),
                        });
                    }
                }
                Some(expr) => {
                    let mut tables = std::collections::BTreeSet::new();
                    expr.referenced_tables(&mut tables);
                    for table in tables {
                        if table != BASE && !option.required_joins().contains(&table) {
                            return Err(SourceError::ExpressionJoinMismatch {
                                column: format!("{}-{}", option.col_type(), option.value()),
                                table,
                            });
                        }
                    }
                }
            }
            filter_index.insert(option.key(), idx);
        }

        Ok(Self {
            columns,
            filters,
            column_index,
            filter_index,
        })
    }

    pub fn resolve_column(&self, col_type: &str, value: &str) -> SourceResult<&ColumnOption> {
        self.column_index
            .get(&(col_type.to_string(), value.to_string()))
            .map(|&idx| &self.columns[idx])
            .ok_or_else(|| SourceError::ColumnOptionNotFound {
                col_type: col_type.to_string(),
                value: value.to_string(),
            })
    }

    pub fn resolve_filter(&self, col_type: &str, value: &str) -> SourceResult<&FilterOption> {
        self.filter_index
            .get(&(col_type.to_string(), value.to_string()))
            .map(|&idx| &self.filters[idx])
            .ok_or_else(|| SourceError::FilterOptionNotFound {
                col_type: col_type.to_string(),
                value: value.to_string(),
            })
    }

    /// All column options, in registration order.
    pub fn columns(&self) -> &[ColumnOption] {
        &self.columns
    }

    /// All filter options, in registration order.
    pub fn filters(&self) -> &[FilterOption] {
        &self.filters
    }
}
