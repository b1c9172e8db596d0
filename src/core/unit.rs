//! Unit records and relationship kinds.
//!
//! A [`UnitRecord`] is what an external parser hands us: loosely shaped,
//! every relationship list optional. The catalog turns records into [`Unit`]s
//! whose relationships are keyed by the closed [`EdgeKind`] enum.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The kinds of edge a unit can declare towards another unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// The target must be selected whenever the source is.
    Requires,
    /// Source and target may never be selected together. Symmetric.
    Conflicts,
    /// Advisory: the target pairs well with the source.
    Recommends,
    /// Advisory: the target pairs poorly with the source.
    Discourages,
    /// The target performs setup the source depends on.
    SetupDependency,
}

impl EdgeKind {
    pub const ALL: [Self; 5] = [
        Self::Requires,
        Self::Conflicts,
        Self::Recommends,
        Self::Discourages,
        Self::SetupDependency,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requires => "requires",
            Self::Conflicts => "conflicts",
            Self::Recommends => "recommends",
            Self::Discourages => "discourages",
            Self::SetupDependency => "setup_dependency",
        }
    }

    /// Edges that force their target into any selection containing the source.
    #[must_use]
    pub const fn is_dependency(self) -> bool {
        matches!(self, Self::Requires | Self::SetupDependency)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed relationship between two units.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// A unit as delivered by the matrix parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitRecord {
    pub id: String,
    pub category: String,
    /// Category-level flag; `None` defers to other declarations.
    #[serde(default)]
    pub exclusive: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(default)]
    pub recommends: Vec<String>,
    #[serde(default)]
    pub discourages: Vec<String>,
    #[serde(default)]
    pub requires_setup: Vec<String>,
    #[serde(default)]
    pub provides_setup_for: Vec<String>,
}

impl UnitRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            ..Self::default()
        }
    }

    /// Every outgoing declaration as `(kind, target)` pairs.
    ///
    /// `provides_setup_for` is reported separately by
    /// [`UnitRecord::incoming_setup`] because the edge points the other way.
    pub fn declared_edges(&self) -> impl Iterator<Item = (EdgeKind, &str)> {
        let lists: [(EdgeKind, &Vec<String>); 5] = [
            (EdgeKind::Requires, &self.requires),
            (EdgeKind::Conflicts, &self.conflicts),
            (EdgeKind::Recommends, &self.recommends),
            (EdgeKind::Discourages, &self.discourages),
            (EdgeKind::SetupDependency, &self.requires_setup),
        ];
        lists
            .into_iter()
            .flat_map(|(kind, ids)| ids.iter().map(move |id| (kind, id.as_str())))
    }

    /// Units this one sets up; each yields `target -SetupDependency-> self`.
    pub fn incoming_setup(&self) -> impl Iterator<Item = &str> {
        self.provides_setup_for.iter().map(String::as_str)
    }
}

/// Declared relationships of a unit after catalog normalization.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Relations {
    pub requires: BTreeSet<String>,
    pub conflicts: BTreeSet<String>,
    pub recommends: BTreeSet<String>,
    pub discourages: BTreeSet<String>,
    pub requires_setup: BTreeSet<String>,
}

impl Relations {
    #[must_use]
    pub const fn get(&self, kind: EdgeKind) -> &BTreeSet<String> {
        match kind {
            EdgeKind::Requires => &self.requires,
            EdgeKind::Conflicts => &self.conflicts,
            EdgeKind::Recommends => &self.recommends,
            EdgeKind::Discourages => &self.discourages,
            EdgeKind::SetupDependency => &self.requires_setup,
        }
    }

    pub(crate) fn get_mut(&mut self, kind: EdgeKind) -> &mut BTreeSet<String> {
        match kind {
            EdgeKind::Requires => &mut self.requires,
            EdgeKind::Conflicts => &mut self.conflicts,
            EdgeKind::Recommends => &mut self.recommends,
            EdgeKind::Discourages => &mut self.discourages,
            EdgeKind::SetupDependency => &mut self.requires_setup,
        }
    }
}

/// A catalogued content unit.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Unit {
    pub id: String,
    pub category: String,
    pub description: Option<String>,
    pub body: String,
    pub content_hash: String,
    pub aliases: Vec<String>,
    pub relations: Relations,
}

impl Unit {
    /// Lexical sort key used wherever units must appear in a fixed order.
    #[must_use]
    pub fn sort_key(&self) -> (&str, &str) {
        (self.category.as_str(), self.id.as_str())
    }
}

/// Category policy as declared in the matrix's category table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: String,
    #[serde(default)]
    pub exclusive: bool,
    #[serde(default)]
    pub description: Option<String>,
}
