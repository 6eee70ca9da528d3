//! explorer-e2e CLI library
//!
//! Command-line runner for the explorer end-to-end suites: configuration
//! layering, logging, progress output and report writing around the
//! `explorer-e2e` harness.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
mod runner;

pub use commands::{
    Cli, ColorArg, Commands, ListArgs, LogFormatArg, ReportFormatArg, RunArgs, SelectionArgs,
};
pub use config::{
    CliConfig, ColorChoice, ReportConfig, Verbosity, BASE_URL_ENV, CHROMIUM_PATH_ENV,
    DEFAULT_REPORT_DIR,
};
pub use error::{CliError, CliResult};
pub use output::{render_listing, ProgressReporter};
pub use runner::SuiteRunner;
