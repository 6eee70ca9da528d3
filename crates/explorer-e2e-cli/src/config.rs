//! CLI configuration
//!
//! Resolved in layers, later layers winning: built-in defaults, the YAML
//! file given by `--config`, environment variables, command-line flags.

use crate::commands::{RunArgs, SelectionArgs};
use crate::error::{CliError, CliResult};
use explorer_e2e::{
    BrowserConfig, ContextConfig, ReportFormat, RetryBudget, RunnerConfig, SuiteParams, TagFilter,
    DEFAULT_BASE_URL,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "EXPLORER_E2E_BASE_URL";

/// Environment variable overriding the chromium binary
pub const CHROMIUM_PATH_ENV: &str = "CHROMIUM_PATH";

/// Report directory used when only a format is given
pub const DEFAULT_REPORT_DIR: &str = "target/explorer-e2e";

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Map `-q` and the `-v` count to a level
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// Where to write the run report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Report format; inferred from `output` when absent
    pub format: Option<ReportFormat>,
    /// Report path; defaults under `target/explorer-e2e`
    pub output: Option<PathBuf>,
}

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Verbosity level
    #[serde(skip)]
    pub verbosity: Verbosity,
    /// Color output choice
    #[serde(skip)]
    pub color: ColorChoice,
    /// Explorer base URL
    pub base_url: String,
    /// Tag selection (empty = every suite)
    pub tags: Vec<String>,
    /// Case name filter
    pub filter: Option<String>,
    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,
    /// Case-level retries
    pub retries: u32,
    /// Default assertion timeout
    pub timeout_ms: u64,
    /// Assertion poll interval
    pub poll_interval_ms: u64,
    /// Limit on one case attempt
    pub case_timeout_ms: Option<u64>,
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Suite data
    pub suites: SuiteParams,
    /// Report output
    pub report: ReportConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        let budget = RetryBudget::default();
        Self {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
            base_url: DEFAULT_BASE_URL.to_string(),
            tags: Vec::new(),
            filter: None,
            jobs: 1,
            retries: 0,
            timeout_ms: budget.timeout.as_millis() as u64,
            poll_interval_ms: budget.poll_interval.as_millis() as u64,
            case_timeout_ms: None,
            browser: BrowserConfig::default(),
            suites: SuiteParams::default(),
            report: ReportConfig::default(),
        }
    }
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, then the config file if given, then the process environment
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a YAML config file; absent keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&text)
    }

    /// Parse YAML config text
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a valid config
    pub fn from_yaml(text: &str) -> CliResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Apply environment overrides read through `var`
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var(BASE_URL_ENV).filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(path) = var(CHROMIUM_PATH_ENV).filter(|v| !v.is_empty()) {
            self.browser.chromium_path = Some(path);
        }
    }

    /// Apply `--tag` and `--filter`
    pub fn apply_selection(&mut self, args: &SelectionArgs) {
        if !args.tags.is_empty() {
            self.tags.clone_from(&args.tags);
        }
        if let Some(filter) = &args.filter {
            self.filter = Some(filter.clone());
        }
    }

    /// Apply the run flags
    pub fn apply_run_args(&mut self, args: &RunArgs) {
        self.apply_selection(&args.selection);
        if let Some(url) = &args.base_url {
            self.base_url.clone_from(url);
        }
        if let Some(jobs) = args.jobs {
            self.jobs = jobs;
        }
        if let Some(retries) = args.retries {
            self.retries = retries;
        }
        if let Some(ms) = args.timeout {
            self.timeout_ms = ms;
        }
        if let Some(ms) = args.poll_interval {
            self.poll_interval_ms = ms;
        }
        if let Some(ms) = args.case_timeout {
            self.case_timeout_ms = Some(ms);
        }
        if let Some(ms) = args.settle {
            self.suites.settle = Some(Duration::from_millis(ms));
        }
        if let Some(path) = &args.chromium_path {
            self.browser.chromium_path = Some(path.clone());
        }
        if args.headed {
            self.browser.headless = false;
        }
        if args.no_sandbox {
            self.browser.sandbox = false;
        }
        if let Some(format) = args.format {
            self.report.format = Some(format.into());
        }
        if let Some(output) = &args.output {
            self.report.output = Some(output.clone());
        }
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set parallel jobs
    #[must_use]
    pub const fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get effective number of parallel jobs
    #[must_use]
    #[allow(clippy::redundant_closure_for_method_calls)] // Cannot use NonZero::get directly due to MSRV 1.75 (stable in 1.79)
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.jobs
        }
    }

    /// Reject settings no run could use
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first problem
    pub fn validate(&self) -> CliResult<()> {
        explorer_e2e::resolve_url(&self.base_url, "/")
            .map_err(|e| CliError::config(e.to_string()))?;
        if self.timeout_ms == 0 {
            return Err(CliError::config("timeout_ms must be positive"));
        }
        if self.poll_interval_ms == 0 {
            return Err(CliError::config("poll_interval_ms must be positive"));
        }
        if self.case_timeout_ms == Some(0) {
            return Err(CliError::config("case_timeout_ms must be positive"));
        }
        Ok(())
    }

    /// Assertion budget
    #[must_use]
    pub const fn budget(&self) -> RetryBudget {
        RetryBudget::from_millis(self.timeout_ms, self.poll_interval_ms)
    }

    /// Tag filter
    #[must_use]
    pub fn tag_filter(&self) -> TagFilter {
        TagFilter::new(self.tags.iter().cloned())
    }

    /// Settings for the library runner
    #[must_use]
    pub fn runner_config(&self) -> RunnerConfig {
        let mut runner = RunnerConfig::new()
            .with_jobs(self.effective_jobs())
            .with_retries(self.retries)
            .with_tags(self.tag_filter())
            .with_context(ContextConfig::new(self.base_url.clone()).with_budget(self.budget()));
        if let Some(ms) = self.case_timeout_ms {
            runner = runner.with_case_timeout(Duration::from_millis(ms));
        }
        if let Some(filter) = &self.filter {
            runner = runner.with_name_filter(filter.clone());
        }
        runner
    }

    /// Report format and path, if a report was requested
    #[must_use]
    pub fn report_target(&self) -> Option<(ReportFormat, PathBuf)> {
        match (&self.report.format, &self.report.output) {
            (None, None) => None,
            (Some(format), Some(path)) => Some((*format, path.clone())),
            (Some(format), None) => Some((
                *format,
                Path::new(DEFAULT_REPORT_DIR).join(format!("report.{}", format.extension())),
            )),
            (None, Some(path)) => {
                let format = match path.extension().and_then(|e| e.to_str()) {
                    Some("xml") => ReportFormat::Junit,
                    _ => ReportFormat::Json,
                };
                Some((format, path.clone()))
            }
        }
    }

    /// Render as YAML
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> CliResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
