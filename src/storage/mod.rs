//! Persistence for per-profile selections.

pub mod stacks;

pub use stacks::{StackFile, StackStore};
