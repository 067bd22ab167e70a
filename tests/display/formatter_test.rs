use reportsource::catalog::ColumnOption;
use reportsource::display::{DisplayFn, ExportFormat, Row, UNKNOWN};
use reportsource::source::SourceBuilder;
use reportsource::sql::{qcol, TableExpr};
use serde_json::json;

fn source() -> reportsource::source::ReportSource {
    SourceBuilder::new(TableExpr::table("users"))
        .with_column(ColumnOption::new("user", "firstname", qcol("base", "firstname")))
        .with_column(ColumnOption::new("user", "lastname", qcol("base", "lastname")))
        .with_column(
            ColumnOption::new("user", "fullname", qcol("base", "firstname"))
                .display(DisplayFn::UserFullName)
                .heading("Name"),
        )
        .with_column(
            ColumnOption::new("user", "suspended", qcol("base", "suspended"))
                .display(DisplayFn::YesNo),
        )
        .with_column(
            ColumnOption::new("user", "firstaccess", qcol("base", "firstaccess"))
                .display(DisplayFn::Date),
        )
        .with_column(
            ColumnOption::new("user", "actions", qcol("base", "id")).not_exportable(),
        )
        .build()
        .unwrap()
}

fn row() -> Row {
    let mut row = Row::new();
    row.insert("user_firstname".into(), json!("Ada"));
    row.insert("user_lastname".into(), json!("Lovelace"));
    row.insert("user_fullname".into(), json!("ada"));
    row.insert("user_suspended".into(), json!(0));
    row.insert("user_firstaccess".into(), json!(86_400));
    row.insert("user_actions".into(), json!(12));
    row
}

fn column(source: &reportsource::source::ReportSource, value: &str) -> reportsource::catalog::ReportColumn {
    source
        .new_column_from_option("user", value, None, None, None, false)
        .unwrap()
}

#[test]
fn test_basic_formatting() {
    let source = source();
    let columns = vec![
        column(&source, "fullname"),
        column(&source, "suspended"),
        column(&source, "firstaccess"),
    ];
    let cells = source.format_row(&row(), &columns, ExportFormat::Html);
    assert_eq!(cells, vec!["Ada Lovelace", "No", "1970-01-02"]);
}

#[test]
fn test_stale_column_renders_placeholder() {
    let source = source();
    let mut columns = vec![column(&source, "firstname")];
    // Simulate configuration persisted before the option was removed.
    let mut stale = columns[0].clone();
    stale.value = "removed_field".to_string();
    columns.push(stale);

    let cells = source.format_row(&row(), &columns, ExportFormat::Html);
    assert_eq!(cells, vec!["Ada".to_string(), UNKNOWN.to_string()]);
}

#[test]
fn test_missing_row_field_renders_placeholder() {
    let source = source();
    let columns = vec![column(&source, "lastname")];
    let cells = source.format_row(&Row::new(), &columns, ExportFormat::Html);
    assert_eq!(cells, vec![UNKNOWN.to_string()]);
}

#[test]
fn test_hidden_columns_are_skipped() {
    let source = source();
    let mut hidden = column(&source, "firstname");
    hidden.hidden = true;
    let columns = vec![hidden, column(&source, "lastname")];
    let cells = source.format_row(&row(), &columns, ExportFormat::Html);
    assert_eq!(cells, vec!["Lovelace"]);
}

#[test]
fn test_export_visibility() {
    let source = source();
    let columns = vec![column(&source, "firstname"), column(&source, "actions")];

    // Shown on screen...
    let cells = source.format_row(&row(), &columns, ExportFormat::Html);
    assert_eq!(cells, vec!["Ada", "12"]);

    // ...suppressed in exports.
    for format in [ExportFormat::Csv, ExportFormat::Excel, ExportFormat::Pdf] {
        let cells = source.format_row(&row(), &columns, format);
        assert_eq!(cells, vec!["Ada"]);
    }
}
