//! End-to-end test against a real database: the field catalog is read
//! from SQLite, injection composes the query, and the emitted SQL
//! executes with its bind parameters.

use reportsource::catalog::{ColumnOption, Transform};
use reportsource::customfield::{Entity, FieldCatalog, FieldDefinition, FieldType};
use reportsource::display::{ExportFormat, Row};
use reportsource::error::{SourceError, SourceResult};
use reportsource::join::BASE;
use reportsource::source::SourceBuilder;
use reportsource::sql::{qcol, Param, TableExpr};
use rusqlite::Connection;
use serde_json::json;

/// `FieldCatalog` over the `<prefix>_info_field` tables.
struct SqliteFieldCatalog<'a> {
    conn: &'a Connection,
}

impl FieldCatalog for SqliteFieldCatalog<'_> {
    fn field_definitions(&self, entity: Entity) -> SourceResult<Vec<FieldDefinition>> {
        let sql = format!(
            "SELECT id, shortname, fullname, datatype, hidden, defaultdata, options FROM {}",
            entity.field_table()
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| SourceError::Metadata(e.to_string()))?;
        let fields = stmt
            .query_map([], |row| {
                let datatype: String = row.get(3)?;
                let default: Option<String> = row.get(5)?;
                let options: Option<String> = row.get(6)?;
                Ok(FieldDefinition {
                    id: row.get(0)?,
                    shortname: row.get(1)?,
                    fullname: row.get(2)?,
                    datatype: FieldType::from_name(&datatype),
                    hidden: row.get::<_, i64>(4)? != 0,
                    default_value: default,
                    options: options
                        .map(|o| o.lines().map(str::to_string).collect())
                        .unwrap_or_default(),
                })
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| SourceError::Metadata(e.to_string()))?;
        Ok(fields)
    }
}

fn seed() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE course (id INTEGER PRIMARY KEY, fullname TEXT, startdate INTEGER);
        CREATE TABLE course_info_field (
            id INTEGER PRIMARY KEY,
            shortname TEXT,
            fullname TEXT,
            datatype TEXT,
            hidden INTEGER DEFAULT 0,
            defaultdata TEXT,
            options TEXT
        );
        CREATE TABLE course_info_data (
            id INTEGER PRIMARY KEY,
            courseid INTEGER,
            fieldid INTEGER,
            data TEXT
        );

        -- Start dates: 2024-02-01 and 2024-07-01 UTC.
        INSERT INTO course VALUES
            (1, 'Fire Safety', 1706745600),
            (2, 'First Aid', 1719792000);

        INSERT INTO course_info_field VALUES
            (1, 'dept', 'Department', 'text', 0, NULL, NULL),
            (2, 'region', 'Region', 'menu', 0, 'Unassigned', 'North' || char(10) || 'South');

        -- Only course 1 has stored values.
        INSERT INTO course_info_data VALUES
            (1, 1, 1, 'Operations'),
            (2, 1, 2, 'North');
        "#,
    )
    .unwrap();
    conn
}

fn bind(params: &[Param]) -> Vec<rusqlite::types::Value> {
    params
        .iter()
        .map(|p| match p {
            Param::Int(i) => rusqlite::types::Value::Integer(*i),
            Param::Float(f) => rusqlite::types::Value::Real(*f),
            Param::Str(s) => rusqlite::types::Value::Text(s.clone()),
            Param::Bool(b) => rusqlite::types::Value::Integer(*b as i64),
        })
        .collect()
}

fn fetch_rows(conn: &Connection, sql: &str, params: &[Param]) -> Vec<Row> {
    let mut stmt = conn.prepare(sql).unwrap();
    let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let mut rows = Vec::new();
    let mut results = stmt
        .query(rusqlite::params_from_iter(bind(params)))
        .unwrap();
    while let Some(result) = results.next().unwrap() {
        let mut row = Row::new();
        for (i, name) in names.iter().enumerate() {
            let value: rusqlite::types::Value = result.get(i).unwrap();
            let value = match value {
                rusqlite::types::Value::Null => json!(null),
                rusqlite::types::Value::Integer(n) => json!(n),
                rusqlite::types::Value::Real(f) => json!(f),
                rusqlite::types::Value::Text(s) => json!(s),
                rusqlite::types::Value::Blob(_) => json!(null),
            };
            row.insert(name.clone(), value);
        }
        rows.push(row);
    }
    rows
}

#[test]
fn test_injected_fields_compose_and_execute() {
    let conn = seed();
    let catalog = SqliteFieldCatalog { conn: &conn };

    let mut builder = SourceBuilder::new(TableExpr::table("course"))
        .with_column(ColumnOption::new("course", "fullname", qcol(BASE, "fullname")));
    let injected = builder
        .inject_custom_fields(&catalog, Entity::Course, BASE, "id")
        .unwrap();
    assert!(injected);
    let source = builder.build().unwrap();

    let columns = vec![
        source
            .new_column_from_option("course", "fullname", None, None, None, false)
            .unwrap(),
        source
            .new_column_from_option("course", "custom_dept", None, None, None, false)
            .unwrap(),
        source
            .new_column_from_option("course", "custom_region", None, None, None, false)
            .unwrap(),
    ];
    let (sql, params) = source.compose(&columns, &[]).unwrap().build();
    let rows = fetch_rows(&conn, &sql, &params);
    assert_eq!(rows.len(), 2);

    let by_name = |name: &str| {
        rows.iter()
            .find(|row| row["course_fullname"] == json!(name))
            .unwrap()
    };

    // Course 1 has stored values for both fields.
    let cells = source.format_row(by_name("Fire Safety"), &columns, ExportFormat::Html);
    assert_eq!(cells, vec!["Fire Safety", "Operations", "North"]);

    // Course 2 has no data rows: the menu default kicks in, the
    // defaultless text field renders empty.
    let cells = source.format_row(by_name("First Aid"), &columns, ExportFormat::Html);
    assert_eq!(cells, vec!["First Aid", "", "Unassigned"]);
}

#[test]
fn test_date_transforms_execute_against_epoch_columns() {
    let conn = seed();
    let source = SourceBuilder::new(TableExpr::table("course"))
        .with_column(ColumnOption::new("course", "fullname", qcol(BASE, "fullname")))
        .with_column(
            ColumnOption::new("course", "startdate", qcol(BASE, "startdate")).transformable(),
        )
        .build()
        .unwrap();

    let run = |transform: Transform| {
        let columns = vec![
            source
                .new_column_from_option("course", "fullname", None, None, None, false)
                .unwrap(),
            source
                .new_column_from_option("course", "startdate", Some(transform), None, None, false)
                .unwrap(),
        ];
        let (sql, params) = source.compose(&columns, &[]).unwrap().build();
        fetch_rows(&conn, &sql, &params)
    };

    let rows = run(Transform::YearMonth);
    let bucket = |rows: &[Row], name: &str| {
        rows.iter()
            .find(|row| row["course_fullname"] == json!(name))
            .unwrap()["course_startdate"]
            .clone()
    };
    assert_eq!(bucket(&rows, "Fire Safety"), json!("2024-02"));
    assert_eq!(bucket(&rows, "First Aid"), json!("2024-07"));

    let rows = run(Transform::Quarter);
    assert_eq!(bucket(&rows, "Fire Safety"), json!(1));
    assert_eq!(bucket(&rows, "First Aid"), json!(3));
}

#[test]
fn test_catalog_read_failure_surfaces_as_metadata_error() {
    let conn = Connection::open_in_memory().unwrap();
    let catalog = SqliteFieldCatalog { conn: &conn };
    let mut builder = SourceBuilder::new(TableExpr::table("course"));
    let err = builder
        .inject_custom_fields(&catalog, Entity::Course, BASE, "id")
        .unwrap_err();
    assert!(matches!(err, SourceError::Metadata(_)));
}
