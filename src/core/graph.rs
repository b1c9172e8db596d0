//! Relationship graph over a [`UnitCatalog`].
//!
//! Dependency edges (`Requires` and `SetupDependency`) must form a DAG; the
//! graph refuses to build otherwise and reports the offending path. Once
//! built, the transitive closure of every unit and its reverse are available
//! without traversal.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, SmxError};

use super::catalog::UnitCatalog;
use super::selection::{Selection, SelectionReport, Violation};
use super::unit::{Edge, EdgeKind};

static EMPTY: BTreeSet<String> = BTreeSet::new();

/// Read-only relationship graph, safe to share across threads.
#[derive(Debug, Clone)]
pub struct RelationshipGraph {
    catalog: Arc<UnitCatalog>,
    closure: BTreeMap<String, BTreeSet<String>>,
    dependents: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl RelationshipGraph {
    /// Build the graph, failing with `CycleDetected` when dependencies loop.
    pub fn build(catalog: Arc<UnitCatalog>) -> Result<Self> {
        if let Some(path) = find_dependency_cycle(&catalog) {
            return Err(SmxError::CycleDetected { path });
        }

        let closure = compute_closure(&catalog);
        let mut dependents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (unit, needs) in &closure {
            for needed in needs {
                dependents
                    .entry(needed.clone())
                    .or_default()
                    .insert(unit.clone());
            }
        }

        debug!(
            target: "graph",
            units = catalog.len(),
            edges = count_edges(&catalog),
            "relationship graph built"
        );

        Ok(Self {
            catalog,
            closure,
            dependents,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    /// Direct neighbours of `id` along edges of `kind`.
    #[must_use]
    pub fn neighbors(&self, id: &str, kind: EdgeKind) -> &BTreeSet<String> {
        self.catalog
            .get(id)
            .map_or(&EMPTY, |unit| unit.relations.get(kind))
    }

    /// Everything `id` ultimately needs, excluding `id` itself.
    #[must_use]
    pub fn closure(&self, id: &str) -> &BTreeSet<String> {
        self.closure.get(id).unwrap_or(&EMPTY)
    }

    /// Every unit whose closure contains `id`.
    #[must_use]
    pub fn dependents(&self, id: &str) -> &BTreeSet<String> {
        self.dependents.get(id).unwrap_or(&EMPTY)
    }

    #[must_use]
    pub fn conflicts(&self, a: &str, b: &str) -> bool {
        self.neighbors(a, EdgeKind::Conflicts).contains(b)
    }

    /// Every edge in the graph, sorted. Conflicts appear once per direction.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for unit in self.catalog.iter() {
            for kind in EdgeKind::ALL {
                for target in unit.relations.get(kind) {
                    edges.push(Edge {
                        from: unit.id.clone(),
                        to: target.clone(),
                        kind,
                    });
                }
            }
        }
        edges.sort();
        edges
    }

    /// Check a selection against every structural rule, collecting all
    /// violations plus advisory hints.
    #[must_use]
    pub fn validate_selection(&self, selection: &Selection) -> SelectionReport {
        let mut report = SelectionReport::default();
        let mut by_category: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for id in selection.iter() {
            let Some(unit) = self.catalog.get(id) else {
                report.violations.push(Violation::UnknownUnit {
                    unit: id.to_string(),
                });
                continue;
            };

            if self.catalog.is_exclusive(&unit.category) {
                by_category
                    .entry(unit.category.as_str())
                    .or_default()
                    .push(id);
            }

            for other in &unit.relations.conflicts {
                // Report each pair once.
                if id < other.as_str() && selection.contains(other) {
                    report.violations.push(Violation::Conflict {
                        unit: id.to_string(),
                        conflicts_with: other.clone(),
                    });
                }
            }
            for needed in &unit.relations.requires {
                if !selection.contains(needed) {
                    report.violations.push(Violation::MissingRequirement {
                        unit: id.to_string(),
                        requires: needed.clone(),
                    });
                }
            }
            for setup in &unit.relations.requires_setup {
                if !selection.contains(setup) {
                    report.violations.push(Violation::MissingSetup {
                        unit: id.to_string(),
                        setup: setup.clone(),
                    });
                }
            }
            for discouraged in &unit.relations.discourages {
                if selection.contains(discouraged) {
                    report.discouraged.push((id.to_string(), discouraged.clone()));
                }
            }
        }

        for (category, members) in by_category {
            if members.len() > 1 {
                report.violations.push(Violation::ExclusiveCategory {
                    category: category.to_string(),
                    units: members.into_iter().map(str::to_string).collect(),
                });
            }
        }

        report
    }
}

fn count_edges(catalog: &UnitCatalog) -> usize {
    catalog
        .iter()
        .map(|unit| {
            EdgeKind::ALL
                .iter()
                .map(|kind| unit.relations.get(*kind).len())
                .sum::<usize>()
        })
        .sum()
}

fn dependency_targets<'a>(
    catalog: &'a UnitCatalog,
    id: &str,
) -> impl Iterator<Item = &'a String> + 'a {
    catalog.get(id).into_iter().flat_map(|unit| {
        unit.relations
            .requires
            .iter()
            .chain(unit.relations.requires_setup.iter())
    })
}

/// Three-color DFS over dependency edges. Returns the first cycle found in id
/// order, closed with its starting unit (`a -> b -> a`).
fn find_dependency_cycle(catalog: &UnitCatalog) -> Option<Vec<String>> {
    let mut colors: BTreeMap<&str, Color> = catalog
        .iter()
        .map(|unit| (unit.id.as_str(), Color::White))
        .collect();

    for unit in catalog.iter() {
        if colors.get(unit.id.as_str()) != Some(&Color::White) {
            continue;
        }
        let mut path = Vec::new();
        if let Some(cycle) = visit(catalog, &unit.id, &mut colors, &mut path) {
            return Some(cycle);
        }
    }
    None
}

fn visit<'a>(
    catalog: &'a UnitCatalog,
    id: &'a str,
    colors: &mut BTreeMap<&'a str, Color>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    colors.insert(id, Color::Gray);
    path.push(id);

    for next in dependency_targets(catalog, id) {
        match colors.get(next.as_str()).copied().unwrap_or(Color::White) {
            Color::Gray => {
                let start = path.iter().position(|p| *p == next.as_str()).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|p| (*p).to_string()).collect();
                cycle.push(next.clone());
                return Some(cycle);
            }
            Color::White => {
                if let Some(cycle) = visit(catalog, next, colors, path) {
                    return Some(cycle);
                }
            }
            Color::Black => {}
        }
    }

    path.pop();
    colors.insert(id, Color::Black);
    None
}

/// Closure of each unit over dependency edges. Assumes the relation is acyclic.
fn compute_closure(catalog: &UnitCatalog) -> BTreeMap<String, BTreeSet<String>> {
    let mut closure: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for unit in catalog.iter() {
        fill_closure(catalog, &unit.id, &mut closure);
    }
    closure
}

fn fill_closure(
    catalog: &UnitCatalog,
    id: &str,
    closure: &mut BTreeMap<String, BTreeSet<String>>,
) {
    if closure.contains_key(id) {
        return;
    }
    let mut needs = BTreeSet::new();
    for next in dependency_targets(catalog, id) {
        fill_closure(catalog, next, closure);
        needs.insert(next.clone());
        if let Some(transitive) = closure.get(next.as_str()) {
            needs.extend(transitive.iter().cloned());
        }
    }
    closure.insert(id.to_string(), needs);
}
