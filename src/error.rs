//! Error types for skillmatrix.

use thiserror::Error;

use crate::core::EdgeKind;

pub type Result<T> = std::result::Result<T, SmxError>;

#[derive(Debug, Error)]
pub enum SmxError {
    /// A relationship, preset, or request named a unit the catalog does not know.
    #[error("{}", unknown_unit_message(.unit, .referenced_by.as_ref()))]
    UnknownUnitReference {
        unit: String,
        referenced_by: Option<(String, EdgeKind)>,
    },

    /// The dependency relation (requires + setup) contains a cycle.
    #[error("dependency cycle detected: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    /// Adding `requested` would place two mutually exclusive units in the selection.
    #[error("cannot add {requested}: {unit} conflicts with {conflicts_with} ({reason})")]
    ConflictDetected {
        requested: String,
        unit: String,
        conflicts_with: String,
        reason: ConflictReason,
    },

    /// The composer was handed a selection the resolver would never produce.
    #[error("invalid selection passed to composer: {}", .violations.join("; "))]
    InvalidSelectionPassedToComposer { violations: Vec<String> },

    #[error("hash computation failed: {0}")]
    HashComputationFailure(String),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid template {template}: {message}")]
    InvalidTemplate { template: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why two units cannot coexist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// An explicit `conflicts` declaration.
    Declared,
    /// Both units belong to the same exclusive category.
    ExclusiveCategory(String),
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Declared => write!(f, "declared conflict"),
            Self::ExclusiveCategory(category) => {
                write!(f, "both belong to exclusive category {category}")
            }
        }
    }
}

impl SmxError {
    /// Stable machine-readable error kind for robot output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownUnitReference { .. } => "unknown_unit_reference",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::ConflictDetected { .. } => "conflict_detected",
            Self::InvalidSelectionPassedToComposer { .. } => "invalid_selection_passed_to_composer",
            Self::HashComputationFailure(_) => "hash_computation_failure",
            Self::InvalidCatalog(_) => "invalid_catalog",
            Self::InvalidTemplate { .. } => "invalid_template",
            Self::NotFound(_) => "not_found",
            Self::ValidationFailed(_) => "validation_failed",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }

    /// Process exit code: 2 for problems in the user's data or request, 1 for everything else.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::UnknownUnitReference { .. }
            | Self::CycleDetected { .. }
            | Self::ConflictDetected { .. }
            | Self::InvalidCatalog(_)
            | Self::InvalidTemplate { .. }
            | Self::ValidationFailed(_) => 2,
            _ => 1,
        }
    }

    pub(crate) fn unknown_unit(unit: impl Into<String>) -> Self {
        Self::UnknownUnitReference {
            unit: unit.into(),
            referenced_by: None,
        }
    }
}

fn unknown_unit_message(unit: &str, referenced_by: Option<&(String, EdgeKind)>) -> String {
    match referenced_by {
        Some((source, kind)) => {
            format!("unknown unit {unit} referenced by {source} ({kind})")
        }
        None => format!("unknown unit {unit}"),
    }
}

impl From<serde_json::Error> for SmxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
