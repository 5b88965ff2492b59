//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// mesai - versioned migrations for the attendance database
#[derive(Parser, Debug)]
#[command(name = "mesai")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the SQLite database (overrides the config file)
    #[arg(short, long, global = true, env = "MESAI_DATABASE")]
    pub database: Option<String>,

    /// Path to a config file (default: ./mesai.yml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Migrate(MigrateArgs),

    /// Show applied and pending migrations
    Status(StatusArgs),

    /// List every known migration step
    Steps(StepsArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Stop after this version (default: latest)
    #[arg(short, long)]
    pub target: Option<u32>,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print status as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the steps command
#[derive(Args, Debug)]
pub struct StepsArgs {}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
