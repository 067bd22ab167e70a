//! Join specs and the join dependency graph.
//!
//! A report source declares its joinable tables as named `JoinSpec`s.
//! `JoinGraph` validates the set (names, reserved words, dependencies,
//! cycles) and produces topologically ordered subsets for query
//! emission. Declaration order never matters: dependencies are resolved
//! against the whole set, and genuine cycles are reported as cycles
//! rather than as missing dependencies.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;

use crate::error::{SourceError, SourceResult};
use crate::sql::{Expr, JoinType, TableExpr};

/// The implicit root every source starts from. Never a JoinSpec itself;
/// a dependency on `base` is always satisfied.
pub const BASE: &str = "base";

/// SQL reserved words that may not be used as join names, since join
/// names become table aliases in the emitted query.
static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "all", "and", "any", "as", "asc", "base", "between", "by", "case", "check", "column",
        "constraint", "create", "cross", "current", "default", "delete", "desc", "distinct",
        "drop", "else", "end", "except", "exists", "from", "full", "group", "having", "in",
        "inner", "insert", "intersect", "into", "is", "join", "left", "like", "limit", "not",
        "null", "offset", "on", "or", "order", "outer", "primary", "right", "select", "set",
        "table", "then", "union", "unique", "update", "user", "using", "values", "when", "where",
        "with",
    ]
    .into_iter()
    .collect()
});

/// Join names must be usable as unquoted aliases everywhere.
static JOIN_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

/// A named join fragment: how to reach one table from the tables a
/// source already has. Constructed once at source initialization and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    name: String,
    join_type: JoinType,
    table: TableExpr,
    on: Expr,
    dependencies: Vec<String>,
}

impl JoinSpec {
    /// A join reachable directly from `base`.
    pub fn new(name: &str, join_type: JoinType, table: TableExpr, on: Expr) -> Self {
        Self {
            name: name.into(),
            join_type,
            table,
            on,
            dependencies: vec![BASE.to_string()],
        }
    }

    /// Replace the default `base` dependency with explicit ones.
    pub fn depends_on(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn table(&self) -> &TableExpr {
        &self.table
    }

    pub fn on(&self) -> &Expr {
        &self.on
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

/// The validated join set of a report source.
#[derive(Debug, Clone)]
pub struct JoinGraph {
    specs: Vec<JoinSpec>,
    by_name: HashMap<String, usize>,
    /// Spec indices in topological order (dependencies first).
    topo: Vec<usize>,
}

impl JoinGraph {
    /// Validate a join set and build the dependency graph.
    ///
    /// Fails with `DuplicateJoinName`, `ReservedWordConflict`,
    /// `InvalidJoinName`, `MissingDependency` or `CycleDetected`. All
    /// of these are configuration errors surfaced at source
    /// construction time.
    pub fn build(specs: Vec<JoinSpec>) -> SourceResult<Self> {
        let mut by_name = HashMap::with_capacity(specs.len());
        for (idx, spec) in specs.iter().enumerate() {
            if RESERVED_WORDS.contains(spec.name.as_str()) {
                return Err(SourceError::ReservedWordConflict(spec.name.clone()));
            }
            if !JOIN_NAME.is_match(&spec.name) {
                return Err(SourceError::InvalidJoinName(spec.name.clone()));
            }
            if by_name.insert(spec.name.clone(), idx).is_some() {
                return Err(SourceError::DuplicateJoinName(spec.name.clone()));
            }
        }

        // Dependencies are resolved against the whole set, so the order
        // joins were declared in is irrelevant.
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(specs.len(), specs.len());
        let nodes: Vec<NodeIndex> = (0..specs.len()).map(|idx| graph.add_node(idx)).collect();
        for (idx, spec) in specs.iter().enumerate() {
            for dependency in &spec.dependencies {
                if dependency == BASE {
                    continue;
                }
                let Some(&dep_idx) = by_name.get(dependency) else {
                    return Err(SourceError::MissingDependency {
                        join: spec.name.clone(),
                        dependency: dependency.clone(),
                    });
                };
                graph.add_edge(nodes[dep_idx], nodes[idx], ());
            }
        }

        // Any strongly connected component with more than one member
        // (or a self edge) is a genuine cycle.
        let mut topo = Vec::with_capacity(specs.len());
        for component in tarjan_scc(&graph) {
            if component.len() > 1 {
                let mut names: Vec<String> = component
                    .iter()
                    .map(|&node| specs[graph[node]].name.clone())
                    .collect();
                names.sort();
                return Err(SourceError::CycleDetected(names));
            }
            let node = component[0];
            if graph.find_edge(node, node).is_some() {
                return Err(SourceError::CycleDetected(vec![specs[graph[node]]
                    .name
                    .clone()]));
            }
            topo.push(graph[node]);
        }
        // Tarjan emits components in reverse topological order.
        topo.reverse();

        Ok(Self {
            specs,
            by_name,
            topo,
        })
    }

    /// Whether `name` is satisfied by this graph. `base` always is.
    pub fn contains(&self, name: &str) -> bool {
        name == BASE || self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&JoinSpec> {
        self.by_name.get(name).map(|&idx| &self.specs[idx])
    }

    /// All joins in topological order.
    pub fn ordered(&self) -> impl Iterator<Item = &JoinSpec> {
        self.topo.iter().map(|&idx| &self.specs[idx])
    }

    /// The transitive dependency closure of `required`, in topological
    /// order, ready for emission as JOIN clauses.
    pub fn ordered_subset(&self, required: &[String]) -> SourceResult<Vec<&JoinSpec>> {
        let mut needed = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();
        for name in required {
            if name != BASE {
                stack.push(name);
            }
        }
        while let Some(name) = stack.pop() {
            let Some(&idx) = self.by_name.get(name) else {
                return Err(SourceError::MissingDependency {
                    join: BASE.to_string(),
                    dependency: name.to_string(),
                });
            };
            if needed.insert(idx) {
                for dependency in &self.specs[idx].dependencies {
                    if dependency != BASE {
                        stack.push(dependency);
                    }
                }
            }
        }
        Ok(self
            .topo
            .iter()
            .filter(|idx| needed.contains(*idx))
            .map(|&idx| &self.specs[idx])
            .collect())
    }
}
