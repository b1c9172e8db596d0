//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod compile;
pub mod explain;
pub mod list;
pub mod select;
pub mod validate;

use crate::app::AppContext;
use crate::core::UnitCatalog;
use crate::error::Result;

/// How a command finished when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    /// The command ran, but the data it checked is invalid.
    ValidationFailed,
    /// A removal needs explicit confirmation before it cascades.
    CascadePending,
}

impl CommandOutcome {
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::ValidationFailed => 2,
            Self::CascadePending => 3,
        }
    }
}

pub fn run(ctx: &AppContext, command: &Commands) -> Result<CommandOutcome> {
    match command {
        Commands::List(args) => list::run(ctx, args),
        Commands::Explain(args) => explain::run(ctx, args),
        Commands::Select(args) => select::run(ctx, args),
        Commands::Validate(args) => validate::run(ctx, args),
        Commands::Compile(args) => compile::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List units by category
    List(list::ListArgs),

    /// Show a unit's relationships, closure and dependents
    Explain(explain::ExplainArgs),

    /// Inspect or change a profile's selection
    Select(select::SelectArgs),

    /// Check a profile's selection against every rule
    Validate(validate::ValidateArgs),

    /// Compose and version artifacts for one or more profiles
    Compile(compile::CompileArgs),
}

/// Map user-typed names (ids or aliases) to canonical unit ids.
pub(crate) fn resolve_names(catalog: &UnitCatalog, names: &[String]) -> Result<Vec<String>> {
    names
        .iter()
        .map(|name| catalog.resolve_name(name).map(str::to_string))
        .collect()
}
