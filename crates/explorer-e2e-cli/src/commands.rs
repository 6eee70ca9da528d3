//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// explorer-e2e: run the explorer's browser suites against a live instance
#[derive(Parser, Debug)]
#[command(name = "explorer-e2e")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// YAML configuration file
    #[arg(long, env = "EXPLORER_E2E_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the selected suites
    Run(RunArgs),

    /// List suites and cases after tag and name filtering
    List(ListArgs),

    /// Print the resolved configuration as YAML
    Config(RunArgs),
}

/// Suite and case selection
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Only suites carrying this tag (repeatable, any match selects)
    #[arg(short, long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Only cases whose "suite › case" name contains this
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments for the list command
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Selection
    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Arguments for the run and config commands
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Selection
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Base URL of the explorer under test
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Cases run concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Re-run a failed case this many times
    #[arg(long)]
    pub retries: Option<u32>,

    /// Default assertion timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Assertion poll interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub poll_interval: Option<u64>,

    /// Limit on one case attempt in milliseconds
    #[arg(long, value_name = "MS")]
    pub case_timeout: Option<u64>,

    /// Fixed wait around spotlight clicks in milliseconds
    #[arg(long, value_name = "MS")]
    pub settle: Option<u64>,

    /// Path to the chromium binary
    #[arg(long, value_name = "PATH")]
    pub chromium_path: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the chromium sandbox (containers)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Report file format
    #[arg(long)]
    pub format: Option<ReportFormatArg>,

    /// Report file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormatArg {
    /// JSON run report
    Json,
    /// JUnit XML
    Junit,
}

impl From<ReportFormatArg> for explorer_e2e::ReportFormat {
    fn from(arg: ReportFormatArg) -> Self {
        match arg {
            ReportFormatArg::Json => Self::Json,
            ReportFormatArg::Junit => Self::Junit,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
