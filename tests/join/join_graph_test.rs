use reportsource::error::SourceError;
use reportsource::join::{JoinGraph, JoinSpec, BASE};
use reportsource::sql::{qcol, ExprExt, JoinType, TableExpr};

fn join(name: &str, table: &str) -> JoinSpec {
    JoinSpec::new(
        name,
        JoinType::Left,
        TableExpr::table(table),
        qcol(name, "id").eq(qcol(BASE, format!("{name}id").as_str())),
    )
}

#[test]
fn test_base_course_org_chain_validates() {
    let graph = JoinGraph::build(vec![
        join("course", "course"),
        join("org", "org").depends_on(&["course"]),
    ])
    .unwrap();
    let order: Vec<&str> = graph.ordered().map(|j| j.name()).collect();
    assert_eq!(order, vec!["course", "org"]);
}

#[test]
fn test_declaration_order_is_irrelevant() {
    // org declared before the course join it depends on: still valid,
    // and emission order still puts course first.
    let graph = JoinGraph::build(vec![
        join("org", "org").depends_on(&["course"]),
        join("course", "course"),
    ])
    .unwrap();
    let order: Vec<&str> = graph.ordered().map(|j| j.name()).collect();
    assert_eq!(order, vec!["course", "org"]);
}

#[test]
fn test_missing_dependency_is_about_absence_not_order() {
    let err = JoinGraph::build(vec![join("org", "org").depends_on(&["course"])]).unwrap_err();
    assert_eq!(
        err,
        SourceError::MissingDependency {
            join: "org".into(),
            dependency: "course".into(),
        }
    );
}

#[test]
fn test_true_cycle_is_not_reported_as_missing_dependency() {
    let specs = vec![
        join("a", "ta").depends_on(&["b"]),
        join("b", "tb").depends_on(&["a"]),
    ];
    match JoinGraph::build(specs).unwrap_err() {
        SourceError::CycleDetected(names) => assert_eq!(names, vec!["a", "b"]),
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}

#[test]
fn test_duplicate_and_reserved_names() {
    let err = JoinGraph::build(vec![join("position", "pos"), join("position", "pos2")])
        .unwrap_err();
    assert_eq!(err, SourceError::DuplicateJoinName("position".into()));

    for reserved in ["select", "from", "user", "base", "order"] {
        let err = JoinGraph::build(vec![join(reserved, "t")]).unwrap_err();
        assert_eq!(err, SourceError::ReservedWordConflict(reserved.into()));
    }
}

#[test]
fn test_diamond_dependencies_emit_once_in_order() {
    // position and org both sit on course; a column needing both gets
    // course exactly once, first.
    let graph = JoinGraph::build(vec![
        join("position", "pos").depends_on(&["course"]),
        join("org", "org").depends_on(&["course"]),
        join("course", "course"),
    ])
    .unwrap();
    let subset = graph
        .ordered_subset(&["position".to_string(), "org".to_string()])
        .unwrap();
    let names: Vec<&str> = subset.iter().map(|j| j.name()).collect();
    assert_eq!(names.len(), 3);
    assert_eq!(names[0], "course");
    assert!(names.contains(&"position") && names.contains(&"org"));
}

#[test]
fn test_multi_parent_dependency() {
    let graph = JoinGraph::build(vec![
        join("course", "course"),
        join("user", "users"),
        join("enrolment", "enrol").depends_on(&["course", "user"]),
    ]);
    // "user" is reserved; multi-parent joins must still validate with
    // legal names.
    assert!(graph.is_err());

    let graph = JoinGraph::build(vec![
        join("course", "course"),
        join("learner", "users"),
        join("enrolment", "enrol").depends_on(&["course", "learner"]),
    ])
    .unwrap();
    let subset = graph.ordered_subset(&["enrolment".to_string()]).unwrap();
    let names: Vec<&str> = subset.iter().map(|j| j.name()).collect();
    assert_eq!(*names.last().unwrap(), "enrolment");
    assert!(names.contains(&"course") && names.contains(&"learner"));
}
