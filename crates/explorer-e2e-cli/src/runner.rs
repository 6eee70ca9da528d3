//! Suite runner: ties the resolved configuration to the harness

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::render_listing;
use explorer_e2e::{
    explorer_suites, write_report, PageFactory, RunObserver, RunReport, TestHarness, TestSuite,
};
use std::path::PathBuf;
use tracing::info;

/// Suite runner
#[derive(Debug, Clone)]
pub struct SuiteRunner {
    config: CliConfig,
}

impl SuiteRunner {
    /// Create a runner over a resolved configuration
    #[must_use]
    pub const fn new(config: CliConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &CliConfig {
        &self.config
    }

    /// The explorer suites built from the configured suite data
    #[must_use]
    pub fn suites(&self) -> Vec<TestSuite> {
        explorer_suites(&self.config.suites)
    }

    fn harness(&self) -> TestHarness {
        TestHarness::new(self.config.runner_config())
    }

    /// Selected suites and cases, rendered for `list`
    #[must_use]
    pub fn listing(&self) -> String {
        let suites = self.suites();
        render_listing(&self.harness().select(&suites))
    }

    /// Run the selected cases on pages from `pages`, then write the report
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid, the suites are
    /// malformed, or the report cannot be written. Failing cases are not
    /// errors; they are in the report.
    pub async fn run_with(
        &self,
        pages: &dyn PageFactory,
        observer: &dyn RunObserver,
    ) -> CliResult<RunReport> {
        self.config.validate()?;
        let suites = self.suites();
        let report = self.harness().run(&suites, pages, observer).await?;
        self.write_report(&report)?;
        Ok(report)
    }

    /// Write the report if one was requested; returns where it went
    ///
    /// # Errors
    ///
    /// Returns error if the report cannot be rendered or written
    pub fn write_report(&self, report: &RunReport) -> CliResult<Option<PathBuf>> {
        let Some((format, path)) = self.config.report_target() else {
            return Ok(None);
        };
        write_report(report, format, &path).map_err(|e| CliError::report(&path, e))?;
        info!(path = %path.display(), %format, "report written");
        Ok(Some(path))
    }

    /// Launch chromium, run, and shut the browser down
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or chromium cannot start
    #[cfg(feature = "browser")]
    pub async fn run_browser(&self, observer: &dyn RunObserver) -> CliResult<RunReport> {
        self.config.validate()?;
        let factory = explorer_e2e::ChromiumFactory::launch(self.config.browser.clone()).await?;
        let outcome = self.run_with(&factory, observer).await;
        if let Err(e) = factory.close().await {
            tracing::warn!(error = %e, "browser shutdown failed");
        }
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use explorer_e2e::suites::analytics::{analytics_path, LARGE_TILE, SMALL_TILE};
    use explorer_e2e::suites::DEFAULT_STATE_HASH;
    use explorer_e2e::{MockElement, MockRoute, MockSite, NoopObserver, ReportFormat};

    fn analytics_site(large_tiles: usize) -> MockSite {
        MockSite::new().route(
            MockRoute::new(analytics_path(DEFAULT_STATE_HASH))
                .repeat(4, &MockElement::new(SMALL_TILE, "tile"))
                .repeat(large_tiles, &MockElement::new(LARGE_TILE, "chart")),
        )
    }

    fn analytics_only() -> CliConfig {
        let mut config = CliConfig::new().with_base_url("http://explorer.test");
        config.filter = Some("analytic".into());
        config.timeout_ms = 300;
        config.poll_interval_ms = 20;
        config
    }

    #[test]
    fn test_listing_respects_filter() {
        let listing = SuiteRunner::new(analytics_only()).listing();
        assert!(listing.contains("block analytic tab"));
        assert!(!listing.contains("block spotlight"));
        assert!(listing.ends_with("1 suite(s), 1 case(s)\n"));
    }

    #[tokio::test]
    async fn test_run_with_mock_site() {
        let runner = SuiteRunner::new(analytics_only());
        let report = runner
            .run_with(&analytics_site(2), &NoopObserver)
            .await
            .unwrap();
        assert_eq!(report.total(), 1);
        assert!(report.all_passed());
    }

    #[tokio::test]
    async fn test_failing_case_is_reported_not_raised() {
        let runner = SuiteRunner::new(analytics_only());
        let report = runner
            .run_with(&analytics_site(1), &NoopObserver)
            .await
            .unwrap();
        assert_eq!(report.failed(), 1);
        let reason = report.results().next().unwrap().error().unwrap().to_string();
        assert!(reason.contains("1 element(s)"), "{reason}");
    }

    #[tokio::test]
    async fn test_invalid_config_never_opens_a_page() {
        let site = analytics_site(2);
        let runner = SuiteRunner::new(analytics_only().with_base_url("not-a-url"));
        let err = runner.run_with(&site, &NoopObserver).await.unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(site.pages_opened(), 0);
    }

    #[tokio::test]
    async fn test_report_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/junit.xml");
        let mut config = analytics_only();
        config.report = ReportConfig {
            format: Some(ReportFormat::Junit),
            output: Some(path.clone()),
        };
        let runner = SuiteRunner::new(config);
        runner
            .run_with(&analytics_site(2), &NoopObserver)
            .await
            .unwrap();
        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains("block analytic tab"));
    }

    #[tokio::test]
    async fn test_unwritable_report_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let mut config = analytics_only();
        config.report.output = Some(blocker.join("report.json"));

        let err = SuiteRunner::new(config)
            .run_with(&analytics_site(2), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Report { .. }), "{err}");
        assert!(err.to_string().contains("report.json"));
    }

    #[test]
    fn test_no_report_requested() {
        let runner = SuiteRunner::new(analytics_only());
        let report = RunReport {
            started_at: "2026-01-01T00:00:00Z".parse().unwrap(),
            duration: std::time::Duration::ZERO,
            suites: Vec::new(),
        };
        assert_eq!(runner.write_report(&report).unwrap(), None);
    }
}
