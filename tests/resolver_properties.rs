use proptest::prelude::*;

use skillmatrix::SmxError;
use skillmatrix::compose::CompositionEngine;
use skillmatrix::core::{ResolveOutcome, Selection, SelectionOp, SelectionResolver, SideEffect};
use skillmatrix::test_utils::fixtures::{frontend_graph, frontend_template};

const UNITS: &[&str] = &[
    "react",
    "vue",
    "redux",
    "redux-toolkit",
    "pinia",
    "mobx",
    "jest",
    "vitest",
    "posthog",
    "env-setup",
    "tailwind",
    "css-modules",
];

#[derive(Debug, Clone)]
enum Step {
    Add(usize),
    Remove { index: usize, confirm: bool },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0..UNITS.len()).prop_map(Step::Add),
        1 => (0..UNITS.len(), any::<bool>())
            .prop_map(|(index, confirm)| Step::Remove { index, confirm }),
    ]
}

impl Step {
    fn op(&self) -> SelectionOp {
        match *self {
            Self::Add(index) => SelectionOp::Add(UNITS[index].to_string()),
            Self::Remove { index, confirm } => SelectionOp::Remove {
                unit: UNITS[index].to_string(),
                confirm_cascade: confirm,
            },
        }
    }
}

proptest! {
    #[test]
    fn test_resolved_selections_stay_valid(steps in prop::collection::vec(step(), 0..24)) {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);
        let mut current = Selection::new();

        for step in &steps {
            match resolver.resolve(&current, &step.op()) {
                Ok(ResolveOutcome::Applied(resolution)) => current = resolution.selection,
                Ok(ResolveOutcome::CascadeRequired(_)) => {}
                Err(SmxError::ConflictDetected { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
            let report = graph.validate_selection(&current);
            prop_assert!(report.is_valid(), "{:?} after {:?}", report.violations, step);
        }
    }

    #[test]
    fn test_add_includes_unit_and_its_closure(
        seed in prop::collection::vec(0..UNITS.len(), 0..6),
        target in 0..UNITS.len(),
    ) {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);
        let mut current = Selection::new();
        for index in seed {
            if let Ok(resolution) = resolver.add(&current, UNITS[index]) {
                current = resolution.selection;
            }
        }

        let unit = UNITS[target];
        if let Ok(resolution) = resolver.add(&current, unit) {
            prop_assert!(resolution.selection.contains(unit));
            for needed in graph.closure(unit) {
                prop_assert!(resolution.selection.contains(needed));
            }
            for effect in &resolution.side_effects {
                if let SideEffect::ImplicitlyAdded { unit: added, .. } = effect {
                    prop_assert!(!current.contains(added));
                }
            }
        }
    }

    #[test]
    fn test_unconfirmed_remove_never_drops_dependents(
        seed in prop::collection::vec(0..UNITS.len(), 0..8),
        target in 0..UNITS.len(),
    ) {
        let graph = frontend_graph();
        let resolver = SelectionResolver::new(&graph);
        let mut current = Selection::new();
        for index in seed {
            if let Ok(resolution) = resolver.add(&current, UNITS[index]) {
                current = resolution.selection;
            }
        }

        let unit = UNITS[target];
        let outcome = resolver.remove(&current, unit, false).unwrap();
        match outcome {
            ResolveOutcome::Applied(resolution) => {
                let expected: Selection = current.iter().filter(|id| *id != unit).collect();
                prop_assert_eq!(resolution.selection, expected);
                prop_assert!(resolution.side_effects.is_empty());
            }
            ResolveOutcome::CascadeRequired(request) => {
                prop_assert_eq!(request.unit.as_str(), unit);
                prop_assert!(!request.dependents.is_empty());
                for dependent in &request.dependents {
                    prop_assert!(current.contains(dependent));
                    prop_assert!(graph.dependents(unit).contains(dependent));
                }
            }
        }
    }

    #[test]
    fn test_composition_ignores_insertion_order(
        ids in Just(vec!["vue", "mobx", "jest", "tailwind", "css-modules", "env-setup"])
            .prop_shuffle(),
        take in 1usize..=6,
    ) {
        let graph = frontend_graph();
        let template = frontend_template();
        let engine = CompositionEngine::new(&graph);

        let chosen = &ids[..take];
        let shuffled: Selection = chosen.iter().copied().collect();
        let mut sorted_ids = chosen.to_vec();
        sorted_ids.sort_unstable();
        let sorted: Selection = sorted_ids.into_iter().collect();

        prop_assert!(graph.validate_selection(&sorted).is_valid());

        let a = engine.compose(&shuffled, &template).unwrap();
        let b = engine.compose(&sorted, &template).unwrap();
        prop_assert_eq!(&a.content, &b.content);
        prop_assert_eq!(
            engine.composed_hash(&a, &template).unwrap(),
            engine.composed_hash(&b, &template).unwrap()
        );
    }
}
