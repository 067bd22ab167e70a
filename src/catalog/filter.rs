//! Filter options: the predicates a report can be restricted by.

use serde::{Deserialize, Serialize};

use crate::join::JoinSpec;
use crate::sql::{lit_int, lit_str, Expr, ExprExt};

/// The UI widget a filter renders as, which also determines the shape
/// of input it compiles to a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterWidget {
    Text,
    Number,
    Select,
    Date,
    Multicheck,
    Hierarchy,
}

/// Where a select-style filter gets its choices from.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChoices {
    /// Free-form input, no choice list.
    None,
    /// A fixed `(key, label)` list known at registration time.
    Fixed(Vec<(String, String)>),
    /// Choices resolved on demand (e.g. from a lookup table).
    Lazy(fn() -> Vec<(String, String)>),
}

impl FilterChoices {
    pub fn resolve(&self) -> Vec<(String, String)> {
        match self {
            FilterChoices::None => Vec::new(),
            FilterChoices::Fixed(choices) => choices.clone(),
            FilterChoices::Lazy(resolver) => resolver(),
        }
    }
}

/// Input supplied for a filter when a report runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterInput {
    /// Substring match (text widgets).
    Contains(String),
    /// Exact match against a choice key (select widgets).
    Equals(String),
    /// Inclusive timestamp range; either bound may be open.
    DateRange {
        after: Option<i64>,
        before: Option<i64>,
    },
    /// Match any of the given choice keys (multicheck widgets).
    AnyOf(Vec<String>),
}

/// An addressable filter an administrator can add to a report.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOption {
    col_type: String,
    value: String,
    label: String,
    widget: FilterWidget,
    choices: FilterChoices,
    /// Stand-alone predicate target. When `None` the filter applies to
    /// the column option with the same (type, value).
    expr: Option<Expr>,
    /// Joins a stand-alone predicate needs; unused when the filter
    /// rides on a column option, which carries its own join list.
    joins: Vec<String>,
    /// Joins that compute per-choice usage counts for UI badges.
    count_joins: Vec<JoinSpec>,
}

impl FilterOption {
    pub fn new(col_type: &str, value: &str, label: &str, widget: FilterWidget) -> Self {
        Self {
            col_type: col_type.into(),
            value: value.into(),
            label: label.into(),
            widget,
            choices: FilterChoices::None,
            expr: None,
            joins: Vec::new(),
            count_joins: Vec::new(),
        }
    }

    pub fn choices(mut self, choices: FilterChoices) -> Self {
        self.choices = choices;
        self
    }

    /// Give the filter its own predicate target instead of the
    /// matching column's expression.
    pub fn predicate_expr(mut self, expr: Expr) -> Self {
        self.expr = Some(expr);
        self
    }

    /// Joins the stand-alone predicate needs beyond `base`.
    pub fn joins(mut self, joins: &[&str]) -> Self {
        self.joins = joins.iter().map(|j| j.to_string()).collect();
        self
    }

    pub fn with_count_joins(mut self, joins: Vec<JoinSpec>) -> Self {
        self.count_joins = joins;
        self
    }

    // --- accessors ---

    pub fn key(&self) -> (String, String) {
        (self.col_type.clone(), self.value.clone())
    }

    pub fn col_type(&self) -> &str {
        &self.col_type
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn widget(&self) -> FilterWidget {
        self.widget
    }

    pub fn choice_list(&self) -> Vec<(String, String)> {
        self.choices.resolve()
    }

    pub fn expr(&self) -> Option<&Expr> {
        self.expr.as_ref()
    }

    pub fn required_joins(&self) -> &[String] {
        &self.joins
    }

    pub fn shows_counts(&self) -> bool {
        !self.count_joins.is_empty()
    }

    pub fn count_joins(&self) -> &[JoinSpec] {
        &self.count_joins
    }

    /// Compile filter input into a predicate over `target`, the
    /// expression this filter constrains.
    ///
    /// Returns `None` for input that constrains nothing (empty text,
    /// fully open date range, empty choice set).
    pub fn condition(&self, target: &Expr, input: &FilterInput) -> Option<Expr> {
        match input {
            FilterInput::Contains(text) => {
                if text.is_empty() {
                    return None;
                }
                Some(target.clone().like(lit_str(&format!("%{text}%"))))
            }
            FilterInput::Equals(key) => Some(target.clone().eq(lit_str(key))),
            FilterInput::DateRange { after, before } => {
                let mut predicate: Option<Expr> = None;
                if let Some(after) = after {
                    predicate = Some(target.clone().gte(lit_int(*after)));
                }
                if let Some(before) = before {
                    let upper = target.clone().lte(lit_int(*before));
                    predicate = Some(match predicate {
                        Some(existing) => existing.and(upper),
                        None => upper,
                    });
                }
                predicate
            }
            FilterInput::AnyOf(keys) => {
                if keys.is_empty() {
                    return None;
                }
                // Multicheck choices are keyed by hash; stored values
                // hold the labels, so map keys back before matching.
                let choices = self.choice_list();
                let mut parts = keys.iter().map(|key| {
                    let label = choices
                        .iter()
                        .find(|(choice_key, _)| choice_key == key)
                        .map(|(_, label)| label.as_str())
                        .unwrap_or(key.as_str());
                    target.clone().like(lit_str(&format!("%\"{label}\"%")))
                });
                let first = parts.next()?;
                Some(parts.fold(first, |acc, part| acc.or(part)).paren())
            }
        }
    }
}
