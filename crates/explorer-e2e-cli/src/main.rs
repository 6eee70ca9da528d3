//! explorer-e2e: browser suites for the block explorer
//!
//! ## Usage
//!
//! ```bash
//! explorer-e2e run --tag @CI                      # CI suites
//! explorer-e2e run -f spotlight --headed          # one suite, visible browser
//! explorer-e2e run --format junit -o junit.xml    # JUnit report for CI
//! explorer-e2e list --tag @CI                     # what would run
//! explorer-e2e config --base-url http://host:5274 # resolved settings
//! ```

use clap::Parser;
use explorer_e2e_cli::{
    logging, Cli, CliConfig, CliError, CliResult, ColorChoice, Commands, ProgressReporter,
    SuiteRunner, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every selected case passed
fn run() -> CliResult<bool> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    logging::init(verbosity, cli.log_format)?;

    let config = CliConfig::load(cli.config.as_deref())?
        .with_verbosity(verbosity)
        .with_color(ColorChoice::from(cli.color));

    match cli.command {
        Commands::Run(args) => {
            let mut config = config;
            config.apply_run_args(&args);
            config.validate()?;
            run_suites(config)
        }
        Commands::List(args) => {
            let mut config = config;
            config.apply_selection(&args.selection);
            print!("{}", SuiteRunner::new(config).listing());
            Ok(true)
        }
        Commands::Config(args) => {
            let mut config = config;
            config.apply_run_args(&args);
            config.validate()?;
            print!("{}", config.to_yaml()?);
            Ok(true)
        }
    }
}

#[cfg(feature = "browser")]
fn run_suites(config: CliConfig) -> CliResult<bool> {
    let reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let runner = SuiteRunner::new(config);

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    let report = runtime.block_on(runner.run_browser(&reporter))?;
    reporter.finish();
    reporter.summary(&report);
    if let Some(path) = runner.config().report_target().map(|(_, path)| path) {
        reporter.success(&format!("report written to {}", path.display()));
    }
    Ok(report.all_passed())
}

#[cfg(not(feature = "browser"))]
fn run_suites(_config: CliConfig) -> CliResult<bool> {
    let reporter = ProgressReporter::new(false, false);
    reporter.warning("built without the `browser` feature");
    Err(CliError::config("running suites needs the `browser` feature"))
}
