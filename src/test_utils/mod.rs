//! Shared fixtures and helpers for unit and integration tests.

pub mod fixtures;
pub mod logging;
