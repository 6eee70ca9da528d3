//! Output formatting and progress reporting

use console::{style, Style, Term};
use explorer_e2e::{RunObserver, RunReport, Selection, TestResult};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress reporter for a run
///
/// Case lines go to stderr above the bar; stdout stays free for listings.
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    bar: ProgressBar,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            bar
        };
        Self {
            term: Term::stderr(),
            bar,
            use_color,
            quiet,
        }
    }

    /// Clear the bar once the run is over
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn line(&self, text: &str) {
        self.bar.suspend(|| {
            let _ = self.term.write_line(text);
        });
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        self.line("");
        self.line(&styled);
    }

    /// Print the run summary and every failure reason
    pub fn summary(&self, report: &RunReport) {
        let failed = report.failed();
        if self.quiet && failed == 0 {
            return;
        }

        if failed > 0 {
            self.header("Failures");
            for result in report.results().filter(|r| !r.passed()) {
                self.failure(&result.full_name());
                if let Some(reason) = result.error() {
                    self.line(&format!("    {reason}"));
                }
            }
        }

        let _ = self.term.write_line("");
        let passed = report.passed();
        let total = report.total();
        let secs = report.duration.as_secs_f64();
        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };
            let _ = self.term.write_line(&format!(
                "{} {} cases in {:.2}s ({} passed, {} failed)",
                status,
                total,
                secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} cases in {secs:.2}s ({passed} passed, {failed} failed)"
            ));
        }
    }
}

impl RunObserver for ProgressReporter {
    fn run_started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn case_started(&self, suite: &str, case: &str) {
        self.bar.set_message(format!("{suite} › {case}"));
    }

    fn case_finished(&self, result: &TestResult) {
        let mut name = result.full_name();
        if result.attempts > 1 {
            name.push_str(&format!(" (attempt {})", result.attempts));
        }
        match result.error() {
            None => self.success(&name),
            Some(reason) => {
                self.failure(&name);
                self.line(&format!("    {reason}"));
            }
        }
        self.bar.inc(1);
    }
}

/// Render a selection for `list`, one suite per block
#[must_use]
pub fn render_listing(selection: &Selection<'_>) -> String {
    let mut out = String::new();
    for (suite, cases) in selection {
        let tags = suite.tags.iter().cloned().collect::<Vec<_>>().join(" ");
        if tags.is_empty() {
            out.push_str(&format!("{}\n", suite.name));
        } else {
            out.push_str(&format!("{} [{tags}]\n", suite.name));
        }
        for case in cases {
            out.push_str(&format!("  {}\n", case.description));
        }
    }
    let cases: usize = selection.iter().map(|(_, cases)| cases.len()).sum();
    out.push_str(&format!("{} suite(s), {cases} case(s)\n", selection.len()));
    out
}
