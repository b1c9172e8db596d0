//! Composition of accepted selections into role-template artifacts

pub mod engine;
pub mod template;

pub use engine::{ComposedArtifact, CompositionEngine, DEFAULT_SEPARATOR, SlotFill};
pub use template::{RoleTemplate, SlotPredicate, TemplateSlot};
