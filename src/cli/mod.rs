//! # CLI
//!
//! Command-line interface for running the booking suites in CI pipelines.
//!
//! - `booker-e2e run --suite all --report report.json`
//! - Exit code reflects whether any step failed
//! - Text or JSON output

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "booker-e2e", version, about = "End-to-end checks for the restful-booker API")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the selected suites against the booking API.
    Run(RunArgs),
    /// Print the execution order and dependencies of the selected suites.
    Plan {
        #[arg(long, value_enum, default_value_t = Suite::All)]
        suite: Suite,
    },
    /// Print a generated booking record as JSON.
    Generate {
        #[arg(long)]
        seed: Option<u64>,
        /// Generate a partial update record instead.
        #[arg(long)]
        partial: bool,
    },
    /// List recent runs from a history database.
    History {
        #[arg(long)]
        db: PathBuf,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Print the full JSON report of one run instead of the list.
        #[arg(long, value_name = "ID")]
        show: Option<i64>,
    },
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Config file; `booker.toml` in the working directory is used when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long, value_enum, default_value_t = Suite::All)]
    pub suite: Suite,

    /// Seed for generated booking data.
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the JSON report to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Record the run in this SQLite database.
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Per-request timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Which suites to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Suite {
    Lifecycle,
    Schema,
    #[default]
    All,
}

impl Suite {
    pub fn includes_lifecycle(self) -> bool {
        matches!(self, Suite::Lifecycle | Suite::All)
    }

    pub fn includes_schema(self) -> bool {
        matches!(self, Suite::Schema | Suite::All)
    }
}

/// Output format for run reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
