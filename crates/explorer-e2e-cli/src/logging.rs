//! Log subscriber setup.
//!
//! Logs go to stderr so stdout stays clean for listings and YAML. `RUST_LOG`
//! overrides the level derived from `-q`/`-v`.

use crate::commands::LogFormatArg;
use crate::config::Verbosity;
use crate::error::{CliError, CliResult};
use tracing_subscriber::EnvFilter;

/// Default filter directives for a verbosity level
#[must_use]
pub const fn default_directives(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "warn,explorer_e2e=info,explorer_e2e_cli=info",
        Verbosity::Debug => "info,explorer_e2e=debug,explorer_e2e_cli=debug",
    }
}

/// Build the filter: `RUST_LOG` when set, otherwise the verbosity default
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)))
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns error if a subscriber is already installed
pub fn init(verbosity: Verbosity, format: LogFormatArg) -> CliResult<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormatArg::Text => builder.with_target(verbosity.is_verbose()).try_init(),
        LogFormatArg::Json => builder.json().try_init(),
    };
    installed.map_err(|e| CliError::config(format!("cannot install logger: {e}")))
}
