//! Deterministic merging of a selection into a role template.

use serde::Serialize;
use tracing::debug;

use crate::core::{RelationshipGraph, Selection, Unit};
use crate::error::{Result, SmxError};
use crate::versioning::hash::{self, HashInputs};

use super::template::RoleTemplate;

pub const DEFAULT_SEPARATOR: &str = "\n\n---\n\n";

/// Which units landed in a slot, in render order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotFill {
    pub name: String,
    pub unit_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedArtifact {
    pub template_id: String,
    pub content: String,
    /// Sorted.
    pub selected_unit_ids: Vec<String>,
    pub slots: Vec<SlotFill>,
}

pub struct CompositionEngine<'g> {
    graph: &'g RelationshipGraph,
    separator: String,
}

impl<'g> CompositionEngine<'g> {
    #[must_use]
    pub fn new(graph: &'g RelationshipGraph) -> Self {
        Self::with_separator(graph, DEFAULT_SEPARATOR)
    }

    #[must_use]
    pub fn with_separator(graph: &'g RelationshipGraph, separator: impl Into<String>) -> Self {
        Self {
            graph,
            separator: separator.into(),
        }
    }

    /// Render `template` from the units in `selection`.
    ///
    /// The selection must already satisfy every structural rule; the engine
    /// does not repair selections.
    pub fn compose(
        &self,
        selection: &Selection,
        template: &RoleTemplate,
    ) -> Result<ComposedArtifact> {
        let report = self.graph.validate_selection(selection);
        if !report.is_valid() {
            return Err(SmxError::InvalidSelectionPassedToComposer {
                violations: report.violations.iter().map(ToString::to_string).collect(),
            });
        }
        template.validate(self.graph.catalog())?;

        let mut units = self.selected_units(selection)?;
        units.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut sections = Vec::with_capacity(template.slots.len() + 1);
        if let Some(preamble) = template
            .preamble
            .as_deref()
            .map(|p| p.trim_end_matches('\n'))
            .filter(|p| !p.is_empty())
        {
            sections.push(preamble.to_string());
        }

        let mut slots = Vec::with_capacity(template.slots.len());
        for slot in &template.slots {
            let members: Vec<&Unit> = units
                .iter()
                .copied()
                .filter(|unit| slot.predicate.matches(unit))
                .collect();
            let body = members
                .iter()
                .map(|unit| unit.body.as_str())
                .collect::<Vec<_>>()
                .join(&self.separator);
            sections.push(format!("<slot name=\"{}\">\n{body}\n</slot>", slot.name));
            slots.push(SlotFill {
                name: slot.name.clone(),
                unit_ids: members.iter().map(|unit| unit.id.clone()).collect(),
            });
        }

        let mut content = sections.join("\n\n");
        content.push('\n');

        debug!(
            target: "compose",
            template = %template.id,
            units = units.len(),
            bytes = content.len(),
            "artifact composed"
        );

        Ok(ComposedArtifact {
            template_id: template.id.clone(),
            content,
            selected_unit_ids: selection.to_sorted_vec(),
            slots,
        })
    }

    /// Identity hash for an artifact composed by this engine from `template`.
    pub fn composed_hash(
        &self,
        artifact: &ComposedArtifact,
        template: &RoleTemplate,
    ) -> Result<String> {
        let fingerprint = template.fingerprint()?;
        let catalog = self.graph.catalog();
        let units = artifact
            .selected_unit_ids
            .iter()
            .map(|id| catalog.require(id))
            .collect::<Result<Vec<_>>>()?;
        hash::composed_hash(
            HashInputs {
                template_id: &template.id,
                template_fingerprint: &fingerprint,
                separator: &self.separator,
            },
            units
                .iter()
                .map(|unit| (unit.id.as_str(), unit.content_hash.as_str())),
        )
    }

    fn selected_units(&self, selection: &Selection) -> Result<Vec<&'g Unit>> {
        let catalog: &'g _ = self.graph.catalog();
        selection.iter().map(|id| catalog.require(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::template::TemplateSlot;
    use crate::test_utils::fixtures::{frontend_graph, frontend_template, selection};

    #[test]
    fn renders_slots_in_template_order_with_sorted_units() {
        let graph = frontend_graph();
        let engine = CompositionEngine::new(&graph);
        let artifact = engine
            .compose(
                &selection(&["redux", "react", "vitest"]),
                &frontend_template(),
            )
            .unwrap();

        insta::assert_snapshot!(artifact.content, @r#"
        You are a frontend engineer.

        <slot name="stack">
        react body

        ---

        redux body
        </slot>

        <slot name="quality">
        vitest body
        </slot>

        <slot name="everything">
        react body

        ---

        redux body

        ---

        vitest body
        </slot>
        "#);
        assert_eq!(artifact.selected_unit_ids, vec!["react", "redux", "vitest"]);
        assert_eq!(artifact.slots[0].unit_ids, vec!["react", "redux"]);
    }

    #[test]
    fn empty_slots_are_rendered_not_omitted() {
        let graph = frontend_graph();
        let engine = CompositionEngine::with_separator(&graph, "\n");
        let template = RoleTemplate::new("bare", vec![TemplateSlot::new("tests", &["testing"])]);
        let artifact = engine.compose(&selection(&["react"]), &template).unwrap();
        assert_eq!(artifact.content, "<slot name=\"tests\">\n\n</slot>\n");
        assert!(artifact.slots[0].unit_ids.is_empty());
    }

    #[test]
    fn rejects_invalid_selection_naming_units() {
        let graph = frontend_graph();
        let engine = CompositionEngine::new(&graph);
        let err = engine
            .compose(&selection(&["redux"]), &frontend_template())
            .unwrap_err();
        match err {
            SmxError::InvalidSelectionPassedToComposer { violations } => {
                assert_eq!(violations, vec!["redux requires react, which is not selected"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn composed_hash_depends_on_separator() {
        let graph = frontend_graph();
        let template = frontend_template();
        let current = selection(&["react"]);

        let dashes = CompositionEngine::new(&graph);
        let newline = CompositionEngine::with_separator(&graph, "\n");
        let a = dashes.compose(&current, &template).unwrap();
        let b = newline.compose(&current, &template).unwrap();
        assert_ne!(
            dashes.composed_hash(&a, &template).unwrap(),
            newline.composed_hash(&b, &template).unwrap()
        );
        assert_eq!(
            dashes.composed_hash(&a, &template).unwrap(),
            dashes.composed_hash(&a, &template).unwrap()
        );
    }
}
