//! Row formatting.
//!
//! A result row is a flat `{type}_{value}` keyed map produced by the
//! composed query. Formatting is deliberately tolerant: a report whose
//! stored configuration references a column the source no longer
//! provides renders a placeholder instead of failing, so schema
//! upgrades never break existing reports at render time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{OptionCatalog, ReportColumn};

/// A raw result row keyed by `{type}_{value}` field aliases.
pub type Row = HashMap<String, Value>;

/// Placeholder rendered when a row has no field for a configured
/// column.
pub const UNKNOWN: &str = "(unknown)";

/// Output format a row is being rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Html,
    Csv,
    Excel,
    Pdf,
}

impl ExportFormat {
    /// Export formats honor column export-visibility flags.
    pub fn is_export(&self) -> bool {
        !matches!(self, ExportFormat::Html)
    }
}

/// Identifier of the function that renders a column's raw value.
///
/// Display functions receive the whole row, so they may combine
/// sibling fields (`UserFullName`) or branch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayFn {
    Plain,
    YesNo,
    Date,
    DateTime,
    Multiline,
    FileLink,
    MultiselectText,
    MultiselectIcon,
    UserFullName,
}

impl DisplayFn {
    /// Render a single cell. `col_type` is the owning column's type,
    /// used to locate sibling fields on the row.
    pub fn render(&self, value: Option<&Value>, row: &Row, col_type: &str) -> String {
        match self {
            DisplayFn::Plain | DisplayFn::Multiline | DisplayFn::FileLink => {
                value.map(plain).unwrap_or_default()
            }
            DisplayFn::YesNo => {
                if value.map(truthy).unwrap_or(false) {
                    "Yes".to_string()
                } else {
                    "No".to_string()
                }
            }
            DisplayFn::Date => value
                .and_then(as_epoch)
                .map(format_date)
                .unwrap_or_default(),
            DisplayFn::DateTime => value
                .and_then(as_epoch)
                .map(format_datetime)
                .unwrap_or_default(),
            DisplayFn::MultiselectText => selections(value).join(", "),
            DisplayFn::MultiselectIcon => selections(value)
                .iter()
                .map(|label| format!("[{label}]"))
                .collect::<Vec<_>>()
                .join(" "),
            DisplayFn::UserFullName => {
                let first = sibling(row, col_type, "firstname");
                let last = sibling(row, col_type, "lastname");
                match (first, last) {
                    (Some(first), Some(last)) => format!("{first} {last}"),
                    (Some(name), None) | (None, Some(name)) => name,
                    (None, None) => value.map(plain).unwrap_or_default(),
                }
            }
        }
    }
}

/// Render one row for the given columns.
///
/// Hidden columns are skipped; non-exportable columns are skipped in
/// export formats; anything unresolvable renders as `"(unknown)"`.
pub fn format_row(
    row: &Row,
    columns: &[ReportColumn],
    catalog: &OptionCatalog,
    format: ExportFormat,
) -> Vec<String> {
    let mut cells = Vec::with_capacity(columns.len());
    for column in columns {
        if column.hidden {
            continue;
        }
        let option = match catalog.resolve_column(&column.col_type, &column.value) {
            Ok(option) => option,
            Err(_) => {
                // Stale configuration: the option was removed from the
                // source after this report was configured.
                cells.push(UNKNOWN.to_string());
                continue;
            }
        };
        if format.is_export() && !option.is_exportable() {
            continue;
        }
        match row.get(&column.field_alias()) {
            Some(value) => {
                cells.push(option.display_fn().render(Some(value), row, &column.col_type));
            }
            None => cells.push(UNKNOWN.to_string()),
        }
    }
    cells
}

// =============================================================================
// Value helpers
// =============================================================================

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => s == "1" || s.eq_ignore_ascii_case("yes"),
        _ => false,
    }
}

fn as_epoch(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Multiselect values arrive either as a JSON array or as the raw JSON
/// text the data table stores.
fn selections(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(plain).collect(),
        Some(Value::String(s)) => match serde_json::from_str::<Vec<String>>(s) {
            Ok(labels) => labels,
            Err(_) if s.is_empty() => Vec::new(),
            Err(_) => vec![s.clone()],
        },
        _ => Vec::new(),
    }
}

fn sibling(row: &Row, col_type: &str, field: &str) -> Option<String> {
    row.get(&format!("{col_type}_{field}"))
        .filter(|v| !v.is_null())
        .map(plain)
}

// =============================================================================
// Civil date conversion (rows carry Unix epoch seconds)
// =============================================================================

fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if month <= 2 { year + 1 } else { year }, month, day)
}

fn format_date(epoch: i64) -> String {
    let (year, month, day) = civil_from_days(epoch.div_euclid(86_400));
    format!("{year:04}-{month:02}-{day:02}")
}

fn format_datetime(epoch: i64) -> String {
    let secs = epoch.rem_euclid(86_400);
    format!("{} {:02}:{:02}", format_date(epoch), secs / 3_600, secs % 3_600 / 60)
}
