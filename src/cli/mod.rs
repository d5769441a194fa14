//! CLI commands for freshcheck.

pub mod check;
pub mod config;
pub mod init;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;
use crate::freshness::{Aggregation, UnitPreset};
use crate::report::{ExitStatusPolicy, OutputFormat, FAILURE_STATUS};

/// freshcheck - report how stale an upstream branch is
#[derive(Parser)]
#[command(name = "freshcheck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.freshcheck/config.toml)
    #[arg(long, global = true, env = "FRESHCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Parse the command line. On failure clap's message is printed and the
/// exit status is returned: 0 for `--help`/`--version`, [`FAILURE_STATUS`]
/// for usage errors so they never read as a freshness value.
pub fn parse_args<I, T>(args: I) -> Result<Cli, u8>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| {
        let _ = e.print();
        if e.use_stderr() {
            FAILURE_STATUS
        } else {
            0
        }
    })
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report whole days since the latest commit on the configured branches
    Check(CheckArgs),

    /// Print the resolved configuration as TOML
    Config(SourceArgs),

    /// Write a config file with the given source settings
    Init {
        #[command(flatten)]
        source: SourceArgs,

        /// Overwrite an existing config file
        #[arg(long, short)]
        force: bool,
    },
}

/// Settings that can come from flags or the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Repository owner
    #[arg(long, env = "FRESHCHECK_OWNER")]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long, env = "FRESHCHECK_REPO")]
    pub repo: Option<String>,

    /// Branch to check (repeatable, or comma-separated)
    #[arg(
        long = "branch",
        short = 'b',
        env = "FRESHCHECK_BRANCHES",
        value_delimiter = ','
    )]
    pub branches: Vec<String>,

    /// API base URL
    #[arg(long, env = "FRESHCHECK_API_BASE")]
    pub api_base: Option<String>,

    /// Unit size
    #[arg(long, value_enum)]
    pub unit: Option<UnitPreset>,

    /// Unit size in seconds
    #[arg(long, conflicts_with = "unit")]
    pub unit_seconds: Option<u64>,

    /// How to combine branch values
    #[arg(long = "aggregate", value_enum)]
    pub aggregation: Option<Aggregation>,

    /// Per-request timeout in seconds
    #[arg(long = "timeout")]
    pub timeout_secs: Option<u64>,

    /// Retries on transient fetch failures
    #[arg(long)]
    pub retries: Option<u32>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// What the exit status carries
    #[arg(long, value_enum)]
    pub exit_status: Option<ExitStatusPolicy>,
}

impl From<SourceArgs> for Overrides {
    fn from(args: SourceArgs) -> Self {
        Self {
            api_base: args.api_base,
            owner: args.owner,
            repo: args.repo,
            branches: args.branches,
            unit: args.unit,
            unit_seconds: args.unit_seconds,
            aggregation: args.aggregation,
            timeout_secs: args.timeout_secs,
            retries: args.retries,
            format: args.format,
            exit_status: args.exit_status,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Append `freshness=<value>` to this file (defaults to $GITHUB_OUTPUT)
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    /// Also report `stale=true` when the value exceeds this many units
    #[arg(long)]
    pub max_age: Option<u64>,
}
