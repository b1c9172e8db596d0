//! Selection resolution against the relationship graph.
//!
//! The resolver is a pure function of `(graph, selection, op)`. It never
//! mutates its inputs: callers receive a proposed selection plus the side
//! effects that produced it and decide whether to commit. Removing a unit
//! that others depend on yields [`ResolveOutcome::CascadeRequired`] until the
//! caller asks again with the cascade confirmed.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{ConflictReason, Result, SmxError};

use super::graph::RelationshipGraph;
use super::selection::Selection;
use super::unit::EdgeKind;

/// A requested change to a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOp {
    Add(String),
    Remove {
        unit: String,
        /// Set once the caller has seen and accepted the cascade.
        confirm_cascade: bool,
    },
}

/// Something the resolver did beyond the literal request, or advice about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffect {
    /// Pulled in because the requested unit needs it.
    ImplicitlyAdded { unit: String, required_by: String },
    /// Substituted out of an exclusive category.
    Replaced {
        unit: String,
        replaced_by: String,
        category: String,
    },
    /// Left together with a substituted unit it depended on.
    RemovedWithReplaced { unit: String, depended_on: String },
    /// Removed by a confirmed cascade.
    CascadeRemoved { unit: String, depended_on: String },
    /// Advisory: not selected, but recommended by a newly added unit.
    Recommended { unit: String, recommended_by: String },
    /// Advisory: selected alongside a unit that discourages it.
    Discouraged { unit: String, discouraged_by: String },
}

impl SideEffect {
    /// Hints never changed the selection.
    #[must_use]
    pub const fn is_hint(&self) -> bool {
        matches!(self, Self::Recommended { .. } | Self::Discouraged { .. })
    }
}

/// A proposed selection and how it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub selection: Selection,
    pub side_effects: Vec<SideEffect>,
}

impl Resolution {
    fn unchanged(selection: &Selection) -> Self {
        Self {
            selection: selection.clone(),
            side_effects: Vec::new(),
        }
    }
}

/// A removal that would take other units with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeRequest {
    pub unit: String,
    pub dependents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolveOutcome {
    Applied(Resolution),
    CascadeRequired(CascadeRequest),
}

impl ResolveOutcome {
    #[must_use]
    pub fn into_resolution(self) -> Option<Resolution> {
        match self {
            Self::Applied(resolution) => Some(resolution),
            Self::CascadeRequired(_) => None,
        }
    }
}

pub struct SelectionResolver<'g> {
    graph: &'g RelationshipGraph,
}

impl<'g> SelectionResolver<'g> {
    #[must_use]
    pub const fn new(graph: &'g RelationshipGraph) -> Self {
        Self { graph }
    }

    pub fn resolve(&self, selection: &Selection, op: &SelectionOp) -> Result<ResolveOutcome> {
        match op {
            SelectionOp::Add(unit) => self.add(selection, unit).map(ResolveOutcome::Applied),
            SelectionOp::Remove {
                unit,
                confirm_cascade,
            } => self.remove(selection, unit, *confirm_cascade),
        }
    }

    /// Add `unit_id` with everything it needs, substituting exclusive-category
    /// members and failing on conflicts.
    pub fn add(&self, selection: &Selection, unit_id: &str) -> Result<Resolution> {
        let catalog = self.graph.catalog();
        catalog.require(unit_id)?;

        if selection.contains(unit_id) {
            trace!(target: "resolver", unit = unit_id, "already selected");
            return Ok(Resolution::unchanged(selection));
        }

        let mut incoming: BTreeSet<String> = self.graph.closure(unit_id).clone();
        incoming.insert(unit_id.to_string());
        self.check_internal_consistency(unit_id, &incoming)?;

        // Exclusive categories touched by the incoming units evict their
        // current occupants.
        let mut side_effects = Vec::new();
        let mut evicted: BTreeSet<String> = BTreeSet::new();
        for unit in &incoming {
            let category = &catalog.require(unit)?.category;
            if !catalog.is_exclusive(category) {
                continue;
            }
            for occupant in catalog.units_in_category(category) {
                if selection.contains(&occupant.id) && !incoming.contains(&occupant.id) {
                    evicted.insert(occupant.id.clone());
                    side_effects.push(SideEffect::Replaced {
                        unit: occupant.id.clone(),
                        replaced_by: unit.clone(),
                        category: category.clone(),
                    });
                }
            }
        }

        // Anything that needed an evicted unit leaves with it.
        let mut collateral: BTreeSet<String> = BTreeSet::new();
        for member in selection.iter() {
            if evicted.contains(member) {
                continue;
            }
            if let Some(lost) = self
                .graph
                .closure(member)
                .iter()
                .find(|needed| evicted.contains(*needed))
            {
                collateral.insert(member.to_string());
                side_effects.push(SideEffect::RemovedWithReplaced {
                    unit: member.to_string(),
                    depended_on: lost.clone(),
                });
            }
        }

        let remaining: Selection = selection
            .iter()
            .filter(|id| !evicted.contains(*id) && !collateral.contains(*id))
            .collect();

        for unit in &incoming {
            if let Some(other) = self
                .graph
                .neighbors(unit, EdgeKind::Conflicts)
                .iter()
                .find(|other| remaining.contains(other))
            {
                debug!(
                    target: "resolver",
                    requested = unit_id,
                    unit = %unit,
                    conflicts_with = %other,
                    "add rejected"
                );
                return Err(SmxError::ConflictDetected {
                    requested: unit_id.to_string(),
                    unit: unit.clone(),
                    conflicts_with: other.clone(),
                    reason: ConflictReason::Declared,
                });
            }
        }

        let added: Vec<&String> = incoming
            .iter()
            .filter(|id| !selection.contains(id))
            .collect();
        let mut implicit: Vec<SideEffect> = added
            .iter()
            .filter(|id| id.as_str() != unit_id)
            .map(|id| SideEffect::ImplicitlyAdded {
                unit: (*id).clone(),
                required_by: unit_id.to_string(),
            })
            .collect();
        implicit.append(&mut side_effects);
        let mut side_effects = implicit;

        let mut result = remaining;
        for unit in &incoming {
            result.insert(unit.clone());
        }

        side_effects.extend(self.advisory_hints(&result, &added));

        debug!(
            target: "resolver",
            unit = unit_id,
            added = added.len(),
            evicted = evicted.len() + collateral.len(),
            size = result.len(),
            "add resolved"
        );

        Ok(Resolution {
            selection: result,
            side_effects,
        })
    }

    /// Remove `unit_id`. Units depending on it are only removed with
    /// `confirm_cascade`; otherwise the caller gets the list to confirm.
    pub fn remove(
        &self,
        selection: &Selection,
        unit_id: &str,
        confirm_cascade: bool,
    ) -> Result<ResolveOutcome> {
        self.graph.catalog().require(unit_id)?;

        if !selection.contains(unit_id) {
            trace!(target: "resolver", unit = unit_id, "not selected, nothing to remove");
            return Ok(ResolveOutcome::Applied(Resolution::unchanged(selection)));
        }

        let dependents: Vec<String> = self
            .graph
            .dependents(unit_id)
            .iter()
            .filter(|id| selection.contains(id))
            .cloned()
            .collect();

        if !dependents.is_empty() && !confirm_cascade {
            debug!(
                target: "resolver",
                unit = unit_id,
                dependents = ?dependents,
                "cascade confirmation required"
            );
            return Ok(ResolveOutcome::CascadeRequired(CascadeRequest {
                unit: unit_id.to_string(),
                dependents,
            }));
        }

        let mut result = selection.clone();
        result.remove(unit_id);
        let mut side_effects = Vec::with_capacity(dependents.len());
        for dependent in dependents {
            result.remove(&dependent);
            side_effects.push(SideEffect::CascadeRemoved {
                unit: dependent,
                depended_on: unit_id.to_string(),
            });
        }

        debug!(
            target: "resolver",
            unit = unit_id,
            cascaded = side_effects.len(),
            size = result.len(),
            "remove resolved"
        );

        Ok(ResolveOutcome::Applied(Resolution {
            selection: result,
            side_effects,
        }))
    }

    /// Apply a preset as sequential adds. The first failure aborts the whole
    /// preset; nothing is partially applied.
    pub fn apply_preset(&self, selection: &Selection, units: &[String]) -> Result<Resolution> {
        let catalog = self.graph.catalog();
        for unit in units {
            catalog.require(unit)?;
        }

        let mut current = Resolution::unchanged(selection);
        for unit in units {
            let step = self.add(&current.selection, unit)?;
            current.selection = step.selection;
            current.side_effects.extend(step.side_effects);
        }
        Ok(current)
    }

    fn check_internal_consistency(
        &self,
        requested: &str,
        incoming: &BTreeSet<String>,
    ) -> Result<()> {
        let catalog = self.graph.catalog();
        let mut exclusive_seen: Vec<(&str, &str)> = Vec::new();

        for unit in incoming {
            if let Some(other) = self
                .graph
                .neighbors(unit, EdgeKind::Conflicts)
                .iter()
                .find(|other| incoming.contains(*other))
            {
                return Err(SmxError::ConflictDetected {
                    requested: requested.to_string(),
                    unit: unit.clone(),
                    conflicts_with: other.clone(),
                    reason: ConflictReason::Declared,
                });
            }

            let category = catalog.require(unit)?.category.as_str();
            if !catalog.is_exclusive(category) {
                continue;
            }
            if let Some((_, first)) = exclusive_seen.iter().find(|(c, _)| *c == category) {
                return Err(SmxError::ConflictDetected {
                    requested: requested.to_string(),
                    unit: (*first).to_string(),
                    conflicts_with: unit.clone(),
                    reason: ConflictReason::ExclusiveCategory(category.to_string()),
                });
            }
            exclusive_seen.push((category, unit.as_str()));
        }
        Ok(())
    }

    fn advisory_hints(&self, result: &Selection, added: &[&String]) -> Vec<SideEffect> {
        let mut hints = Vec::new();
        let mut seen: BTreeSet<(String, String)> = BTreeSet::new();

        for unit in added {
            for recommended in self.graph.neighbors(unit, EdgeKind::Recommends) {
                if !result.contains(recommended)
                    && seen.insert((recommended.clone(), (*unit).clone()))
                {
                    hints.push(SideEffect::Recommended {
                        unit: recommended.clone(),
                        recommended_by: (*unit).clone(),
                    });
                }
            }
        }

        for unit in added {
            for discouraged in self.graph.neighbors(unit, EdgeKind::Discourages) {
                if result.contains(discouraged)
                    && seen.insert((discouraged.clone(), (*unit).clone()))
                {
                    hints.push(SideEffect::Discouraged {
                        unit: discouraged.clone(),
                        discouraged_by: (*unit).clone(),
                    });
                }
            }
            for member in result.iter() {
                if self
                    .graph
                    .neighbors(member, EdgeKind::Discourages)
                    .contains(unit.as_str())
                    && seen.insert(((*unit).clone(), member.to_string()))
                {
                    hints.push(SideEffect::Discouraged {
                        unit: (*unit).clone(),
                        discouraged_by: member.to_string(),
                    });
                }
            }
        }

        hints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{frontend_graph, selection};

    fn ids(selection: &Selection) -> Vec<&str> {
        selection.iter().collect()
    }

    #[test]
    fn add_pulls_in_requirements() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);

        let resolution = resolver.add(&Selection::new(), "redux").unwrap();
        assert_eq!(ids(&resolution.selection), vec!["react", "redux"]);
        assert!(resolution.side_effects.contains(&SideEffect::ImplicitlyAdded {
            unit: "react".into(),
            required_by: "redux".into(),
        }));
    }

    #[test]
    fn add_substitutes_exclusive_category_with_dependents() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);

        let resolution = resolver.add(&selection(&["react", "redux"]), "vue").unwrap();
        assert_eq!(ids(&resolution.selection), vec!["vue"]);
        assert!(resolution.side_effects.contains(&SideEffect::Replaced {
            unit: "react".into(),
            replaced_by: "vue".into(),
            category: "framework".into(),
        }));
        assert!(resolution.side_effects.contains(&SideEffect::RemovedWithReplaced {
            unit: "redux".into(),
            depended_on: "react".into(),
        }));
    }

    #[test]
    fn add_substitutes_through_transitive_requirement() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);

        let resolution = resolver
            .add(&selection(&["react", "redux", "redux-toolkit"]), "pinia")
            .unwrap();
        assert_eq!(ids(&resolution.selection), vec!["pinia", "vue"]);
        let removed: Vec<_> = resolution
            .side_effects
            .iter()
            .filter_map(|e| match e {
                SideEffect::RemovedWithReplaced { unit, .. } => Some(unit.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(removed, vec!["redux", "redux-toolkit"]);
    }

    #[test]
    fn add_is_noop_when_already_selected() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);
        let current = selection(&["react"]);
        let resolution = resolver.add(&current, "react").unwrap();
        assert_eq!(resolution.selection, current);
        assert!(resolution.side_effects.is_empty());
    }

    #[test]
    fn add_rejects_conflict_and_names_both_units() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);
        let current = selection(&["vitest"]);

        let err = resolver.add(&current, "jest").unwrap_err();
        match err {
            SmxError::ConflictDetected {
                requested,
                unit,
                conflicts_with,
                reason,
            } => {
                assert_eq!(requested, "jest");
                assert_eq!(unit, "jest");
                assert_eq!(conflicts_with, "vitest");
                assert_eq!(reason, ConflictReason::Declared);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ids(&current), vec!["vitest"]);
    }

    #[test]
    fn add_rejects_conflict_reached_through_requirements() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);

        // redux-toolkit -> redux, and redux conflicts with mobx.
        let err = resolver
            .add(&selection(&["mobx", "react"]), "redux-toolkit")
            .unwrap_err();
        assert!(matches!(
            err,
            SmxError::ConflictDetected { ref unit, ref conflicts_with, .. }
                if unit == "redux" && conflicts_with == "mobx"
        ));
    }

    #[test]
    fn add_unknown_unit_fails_fast() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);
        let err = resolver.add(&Selection::new(), "angular").unwrap_err();
        assert!(matches!(
            err,
            SmxError::UnknownUnitReference { ref unit, .. } if unit == "angular"
        ));
    }

    #[test]
    fn add_surfaces_recommendations_and_discouragements() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);

        let resolution = resolver.add(&Selection::new(), "react").unwrap();
        assert!(resolution.side_effects.contains(&SideEffect::Recommended {
            unit: "vitest".into(),
            recommended_by: "react".into(),
        }));

        let resolution = resolver.add(&selection(&["css-modules"]), "tailwind").unwrap();
        assert_eq!(ids(&resolution.selection), vec!["css-modules", "tailwind"]);
        assert!(resolution.side_effects.contains(&SideEffect::Discouraged {
            unit: "css-modules".into(),
            discouraged_by: "tailwind".into(),
        }));

        let resolution = resolver.add(&selection(&["tailwind"]), "css-modules").unwrap();
        assert!(resolution.side_effects.contains(&SideEffect::Discouraged {
            unit: "css-modules".into(),
            discouraged_by: "tailwind".into(),
        }));
        assert!(resolution.side_effects.iter().all(SideEffect::is_hint));
    }

    #[test]
    fn add_includes_setup_units() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);
        let resolution = resolver.add(&Selection::new(), "posthog").unwrap();
        assert_eq!(ids(&resolution.selection), vec!["env-setup", "posthog"]);
    }

    #[test]
    fn remove_with_dependents_requires_confirmation() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);
        let current = selection(&["react", "redux"]);

        let outcome = resolver.remove(&current, "react", false).unwrap();
        assert_eq!(
            outcome,
            ResolveOutcome::CascadeRequired(CascadeRequest {
                unit: "react".into(),
                dependents: vec!["redux".into()],
            })
        );
        assert_eq!(ids(&current), vec!["react", "redux"]);

        let outcome = resolver.remove(&current, "react", true).unwrap();
        let resolution = outcome.into_resolution().unwrap();
        assert!(resolution.selection.is_empty());
        assert_eq!(
            resolution.side_effects,
            vec![SideEffect::CascadeRemoved {
                unit: "redux".into(),
                depended_on: "react".into(),
            }]
        );
    }

    #[test]
    fn remove_leaf_needs_no_confirmation() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);
        let outcome = resolver
            .resolve(
                &selection(&["react", "redux"]),
                &SelectionOp::Remove {
                    unit: "redux".into(),
                    confirm_cascade: false,
                },
            )
            .unwrap();
        let resolution = outcome.into_resolution().unwrap();
        assert_eq!(ids(&resolution.selection), vec!["react"]);
        assert!(resolution.side_effects.is_empty());
    }

    #[test]
    fn remove_unselected_is_noop_but_unknown_fails() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);
        let current = selection(&["react"]);
        let outcome = resolver.remove(&current, "vue", false).unwrap();
        assert_eq!(outcome.into_resolution().unwrap().selection, current);
        assert!(resolver.remove(&current, "ghost", true).is_err());
    }

    #[test]
    fn preset_applies_in_order_and_aborts_atomically() {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);

        let preset = vec!["redux-toolkit".to_string(), "vitest".to_string()];
        let resolution = resolver.apply_preset(&Selection::new(), &preset).unwrap();
        assert_eq!(
            ids(&resolution.selection),
            vec!["react", "redux", "redux-toolkit", "vitest"]
        );

        let broken = vec!["vitest".to_string(), "jest".to_string()];
        assert!(matches!(
            resolver.apply_preset(&Selection::new(), &broken),
            Err(SmxError::ConflictDetected { .. })
        ));

        let unknown = vec!["react".to_string(), "ghost".to_string()];
        assert!(matches!(
            resolver.apply_preset(&Selection::new(), &unknown),
            Err(SmxError::UnknownUnitReference { .. })
        ));
    }
}
