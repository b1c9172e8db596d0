//! The set of units chosen for one profile.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An unordered set of unit ids. Stored sorted so iteration, persistence and
/// hashing never depend on the order units were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeSet<String>);

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sorted ids, as written to manifests.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    pub(crate) fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    pub(crate) fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id)
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A structural rule broken by a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    Conflict {
        unit: String,
        conflicts_with: String,
    },
    ExclusiveCategory {
        category: String,
        units: Vec<String>,
    },
    MissingRequirement {
        unit: String,
        requires: String,
    },
    MissingSetup {
        unit: String,
        setup: String,
    },
    UnknownUnit {
        unit: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict {
                unit,
                conflicts_with,
            } => write!(f, "{unit} conflicts with {conflicts_with}"),
            Self::ExclusiveCategory { category, units } => write!(
                f,
                "exclusive category {category} has {} members: {}",
                units.len(),
                units.join(", ")
            ),
            Self::MissingRequirement { unit, requires } => {
                write!(f, "{unit} requires {requires}, which is not selected")
            }
            Self::MissingSetup { unit, setup } => {
                write!(f, "{unit} needs setup from {setup}, which is not selected")
            }
            Self::UnknownUnit { unit } => write!(f, "{unit} is not in the catalog"),
        }
    }
}

/// Outcome of validating a selection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectionReport {
    pub violations: Vec<Violation>,
    /// `(unit, discouraged)` pairs present together. Advisory only.
    pub discouraged: Vec<(String, String)>,
}

impl SelectionReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}
