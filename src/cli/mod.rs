//! Command-line interface for smx.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

pub mod commands;
pub mod output;

pub use commands::{CommandOutcome, Commands};

#[derive(Parser, Debug)]
#[command(
    name = "smx",
    version,
    about = "Select skill stacks per profile and compile them into agent artifacts"
)]
pub struct Cli {
    /// Machine-readable JSON output on stdout
    #[arg(long, global = true, env = "SMX_ROBOT")]
    pub robot: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress logs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use this config file instead of the global and project ones
    #[arg(long, global = true, env = "SMX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project root (defaults to the nearest directory containing smx.toml)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
