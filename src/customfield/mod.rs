//! Custom field injection.
//!
//! Entities that support custom fields keep their field definitions in
//! a `<prefix>_info_field` catalog table and the per-instance values in
//! `<prefix>_info_data`. At source construction time the injector scans
//! the catalog and synthesizes a join, a column option and (for most
//! datatypes) a filter option per field, so custom fields are
//! addressable exactly like built-in columns.

use sha2::{Digest, Sha256};

use crate::catalog::{ColumnOption, FilterChoices, FilterOption, FilterWidget};
use crate::display::DisplayFn;
use crate::error::SourceResult;
use crate::join::{JoinSpec, BASE};
use crate::sql::{coalesce, func, lit_int, lit_str, qcol, Expr, ExprExt, JoinType, SelectExpr, SelectQuery, TableExpr};

/// Capability recorded on columns generated from hidden user fields.
/// Enforcement is the caller's concern; the engine only tags them.
pub const VIEW_HIDDEN_USER_FIELDS: &str = "viewhiddenuserfields";

/// Base entities that carry custom field metadata tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    User,
    Course,
    Program,
    Organisation,
    Position,
    Competency,
    Goal,
}

impl Entity {
    pub fn prefix(&self) -> &'static str {
        match self {
            Entity::User => "user",
            Entity::Course => "course",
            Entity::Program => "program",
            Entity::Organisation => "organisation",
            Entity::Position => "position",
            Entity::Competency => "competency",
            Entity::Goal => "goal",
        }
    }

    /// The metadata catalog table holding field definitions.
    pub fn field_table(&self) -> String {
        format!("{}_info_field", self.prefix())
    }

    /// The table holding per-instance field values.
    pub fn data_table(&self) -> String {
        format!("{}_info_data", self.prefix())
    }

    /// The data table's foreign key back to the entity.
    pub fn data_fk(&self) -> String {
        format!("{}id", self.prefix())
    }
}

/// Declared datatype of a custom field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Textarea,
    Menu,
    Checkbox,
    Date,
    Datetime,
    File,
    Multiselect,
    /// Anything this engine has no mapping for; skipped silently.
    Other(String),
}

impl FieldType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "text" => FieldType::Text,
            "textarea" => FieldType::Textarea,
            "menu" => FieldType::Menu,
            "checkbox" => FieldType::Checkbox,
            "date" => FieldType::Date,
            "datetime" => FieldType::Datetime,
            "file" => FieldType::File,
            "multiselect" => FieldType::Multiselect,
            other => FieldType::Other(other.to_string()),
        }
    }
}

/// One field definition row from a `<prefix>_info_field` table.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
    pub datatype: FieldType,
    pub hidden: bool,
    pub default_value: Option<String>,
    /// Choice labels for menu and multiselect fields.
    pub options: Vec<String>,
}

/// Access to the custom field metadata catalog.
///
/// Injected rather than global so sources stay testable against any
/// backing store.
pub trait FieldCatalog {
    fn field_definitions(&self, entity: Entity) -> SourceResult<Vec<FieldDefinition>>;
}

/// Stable choice key for a multiselect option label.
pub fn choice_key(label: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(label.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Everything injection produced for one entity.
#[derive(Debug, Default)]
pub struct Injected {
    pub joins: Vec<JoinSpec>,
    pub columns: Vec<ColumnOption>,
    pub filters: Vec<FilterOption>,
}

/// Scan `entity`'s field catalog and synthesize joins, column options
/// and filter options onto the given collections.
///
/// `join_name` is the already-registered join the entity is reached
/// through (`base` for the source's own entity) and `join_key` the id
/// column on it. Returns whether anything was injected.
pub fn inject_custom_fields(
    catalog: &dyn FieldCatalog,
    entity: Entity,
    join_name: &str,
    join_key: &str,
    joins: &mut Vec<JoinSpec>,
    columns: &mut Vec<ColumnOption>,
    filters: &mut Vec<FilterOption>,
) -> SourceResult<bool> {
    let mut injected = Injected::default();
    for field in catalog.field_definitions(entity)? {
        // Hidden fields are invisible to reports, except user fields,
        // which stay addressable behind a capability.
        let capability = if field.hidden {
            if entity != Entity::User {
                continue;
            }
            Some(VIEW_HIDDEN_USER_FIELDS)
        } else {
            None
        };
        inject_field(&mut injected, entity, join_name, join_key, &field, capability);
    }
    let any = !injected.columns.is_empty();
    joins.extend(injected.joins);
    columns.extend(injected.columns);
    filters.extend(injected.filters);
    Ok(any)
}

fn inject_field(
    out: &mut Injected,
    entity: Entity,
    join_name: &str,
    join_key: &str,
    field: &FieldDefinition,
    capability: Option<&str>,
) {
    let prefix = entity.prefix();
    let slug = slugify(&field.shortname);
    let cf_join = format!("{prefix}_cf_{slug}");
    let value = format!("custom_{slug}");

    if field.datatype == FieldType::Multiselect {
        inject_multiselect(out, entity, join_name, join_key, field, capability, &cf_join, &slug);
        return;
    }

    let option_joins = option_joins(join_name, &cf_join);
    let option_joins: Vec<&str> = option_joins.iter().map(String::as_str).collect();

    let (display, widget) = match &field.datatype {
        FieldType::Text => (DisplayFn::Plain, Some(FilterWidget::Text)),
        FieldType::Textarea => (DisplayFn::Multiline, Some(FilterWidget::Text)),
        FieldType::Menu => (DisplayFn::Plain, Some(FilterWidget::Select)),
        FieldType::Checkbox => (DisplayFn::YesNo, Some(FilterWidget::Select)),
        FieldType::Date => (DisplayFn::Date, Some(FilterWidget::Date)),
        FieldType::Datetime => (DisplayFn::DateTime, Some(FilterWidget::Date)),
        FieldType::File => (DisplayFn::FileLink, None),
        FieldType::Multiselect | FieldType::Other(_) => return,
    };

    out.joins.push(data_join(entity, join_name, join_key, field, &cf_join));

    // Text and menu defaults apply when no data row exists; the
    // default enters the query as a bound parameter.
    let data = qcol(&cf_join, "data");
    let expr = match (&field.datatype, &field.default_value) {
        (FieldType::Text | FieldType::Menu, Some(default)) if !default.is_empty() => {
            coalesce(vec![data, lit_str(default)])
        }
        _ => data,
    };

    let mut column = ColumnOption::new(prefix, &value, expr)
        .joins(&option_joins)
        .display(display)
        .heading(&field.fullname);
    if let Some(capability) = capability {
        column = column.capability(capability);
    }
    out.columns.push(column);

    if let Some(widget) = widget {
        let choices = match &field.datatype {
            FieldType::Menu => FilterChoices::Fixed(
                field
                    .options
                    .iter()
                    .map(|option| (option.clone(), option.clone()))
                    .collect(),
            ),
            FieldType::Checkbox => FilterChoices::Fixed(vec![
                ("1".to_string(), "Yes".to_string()),
                ("0".to_string(), "No".to_string()),
            ]),
            _ => FilterChoices::None,
        };
        out.filters.push(
            FilterOption::new(prefix, &value, &field.fullname, widget).choices(choices),
        );
    }
}

/// Multiselect fields fan out into two parallel columns (icon and text
/// rendering) over one aggregated join, plus two multicheck filters
/// with per-choice count joins for UI badges.
#[allow(clippy::too_many_arguments)]
fn inject_multiselect(
    out: &mut Injected,
    entity: Entity,
    join_name: &str,
    join_key: &str,
    field: &FieldDefinition,
    capability: Option<&str>,
    cf_join: &str,
    slug: &str,
) {
    let prefix = entity.prefix();
    let fk = entity.data_fk();

    // One aggregated subquery join feeds both columns.
    let aggregated = SelectQuery::new()
        .select(SelectExpr::new(qcol("d", &fk)).with_alias("instanceid"))
        .select(SelectExpr::new(func("MAX", vec![qcol("d", "data")])).with_alias("data"))
        .from(TableExpr::table(&entity.data_table()), "d")
        .filter(qcol("d", "fieldid").eq(lit_int(field.id)))
        .group_by(qcol("d", &fk));
    let mut join = JoinSpec::new(
        cf_join,
        JoinType::Left,
        TableExpr::derived(aggregated),
        qcol(cf_join, "instanceid").eq(qcol(join_name, join_key)),
    );
    if join_name != BASE {
        join = join.depends_on(&[join_name]);
    }
    out.joins.push(join);

    let option_joins = option_joins(join_name, cf_join);
    let option_joins: Vec<&str> = option_joins.iter().map(String::as_str).collect();
    for (suffix, display, heading) in [
        ("text", DisplayFn::MultiselectText, field.fullname.clone()),
        ("icon", DisplayFn::MultiselectIcon, format!("{} (icons)", field.fullname)),
    ] {
        let value = format!("custom_{slug}_{suffix}");
        let mut column = ColumnOption::new(prefix, &value, qcol(cf_join, "data"))
            .joins(&option_joins)
            .display(display)
            .heading(&heading);
        if let Some(capability) = capability {
            column = column.capability(capability);
        }
        out.columns.push(column);

        let choices: Vec<(String, String)> = field
            .options
            .iter()
            .map(|label| (choice_key(label), label.clone()))
            .collect();
        let count_joins: Vec<JoinSpec> = field
            .options
            .iter()
            .map(|label| {
                let key = choice_key(label);
                let counting = SelectQuery::new()
                    .select(SelectExpr::new(qcol("d", &fk)).with_alias("instanceid"))
                    .select(SelectExpr::new(Expr::CountStar).with_alias("occurrences"))
                    .from(TableExpr::table(&entity.data_table()), "d")
                    .filter(
                        qcol("d", "fieldid")
                            .eq(lit_int(field.id))
                            .and(qcol("d", "data").like(lit_str(&format!("%\"{label}\"%")))),
                    )
                    .group_by(qcol("d", &fk));
                // The text and icon filters each carry their own count
                // joins; the suffix keeps the names disjoint.
                let name = format!("{cf_join}_{suffix}_cnt_{}", &key[..8]);
                let mut join = JoinSpec::new(
                    &name,
                    JoinType::Left,
                    TableExpr::derived(counting),
                    qcol(&name, "instanceid").eq(qcol(join_name, join_key)),
                );
                if join_name != BASE {
                    join = join.depends_on(&[join_name]);
                }
                join
            })
            .collect();

        out.filters.push(
            FilterOption::new(prefix, &value, &field.fullname, FilterWidget::Multicheck)
                .choices(FilterChoices::Fixed(choices))
                .with_count_joins(count_joins),
        );
    }
}

/// LEFT join to the field's data table, keyed by entity id + field id.
fn data_join(
    entity: Entity,
    join_name: &str,
    join_key: &str,
    field: &FieldDefinition,
    cf_join: &str,
) -> JoinSpec {
    let on = qcol(cf_join, &entity.data_fk())
        .eq(qcol(join_name, join_key))
        .and(qcol(cf_join, "fieldid").eq(lit_int(field.id)));
    let mut join = JoinSpec::new(
        cf_join,
        JoinType::Left,
        TableExpr::table(&entity.data_table()),
        on,
    );
    if join_name != BASE {
        join = join.depends_on(&[join_name]);
    }
    join
}

fn option_joins(join_name: &str, cf_join: &str) -> Vec<String> {
    if join_name == BASE {
        vec![cf_join.to_string()]
    } else {
        vec![join_name.to_string(), cf_join.to_string()]
    }
}

/// Collapse a field shortname into a join-name-safe identifier.
fn slugify(shortname: &str) -> String {
    let mut slug = String::with_capacity(shortname.len());
    for ch in shortname.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else {
            slug.push('_');
        }
    }
    if slug.is_empty() || !slug.starts_with(|c: char| c.is_ascii_lowercase()) {
        slug.insert_str(0, "f_");
    }
    slug
}
