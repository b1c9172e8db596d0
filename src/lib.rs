//! skillmatrix: a relationship graph over modular skills, a selection
//! resolver that keeps per-profile stacks valid, and a composition pipeline
//! that turns accepted stacks into versioned agent artifacts.

pub mod app;
pub mod cli;
pub mod compose;
pub mod config;
pub mod core;
pub mod error;
pub mod loader;
pub mod storage;
pub mod utils;
pub mod versioning;

#[doc(hidden)]
pub mod test_utils;

pub use error::{Result, SmxError};
