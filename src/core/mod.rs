//! Units, the relationship graph, and selection resolution

pub mod catalog;
pub mod graph;
pub mod resolver;
pub mod selection;
pub mod unit;

pub use catalog::UnitCatalog;
pub use graph::RelationshipGraph;
pub use resolver::{
    CascadeRequest, Resolution, ResolveOutcome, SelectionOp, SelectionResolver, SideEffect,
};
pub use selection::{Selection, SelectionReport, Violation};
pub use unit::{CategoryRecord, Edge, EdgeKind, Relations, Unit, UnitRecord};
