//! Test harness for running test suites.
//!
//! Suites are plain data: a name, a tag set and an ordered list of cases,
//! each case a deferred async body taking its own [`PageContext`]. The
//! [`TestHarness`] selects suites by tag, runs the selected cases with
//! bounded concurrency, and reports verdicts in definition order.

use crate::assertion::retry::duration_ms;
use crate::context::{ContextConfig, PageContext};
use crate::driver::PageFactory;
use crate::result::{HarnessError, HarnessResult};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Future returned by a test case body
pub type CaseFuture<'a> = BoxFuture<'a, HarnessResult<()>>;

type CaseBody = Arc<dyn for<'a> Fn(&'a mut PageContext) -> CaseFuture<'a> + Send + Sync>;

/// A single test case
#[derive(Clone)]
pub struct TestCase {
    /// Case description, unique within its suite
    pub description: String,
    body: CaseBody,
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl TestCase {
    /// Create a new test case
    ///
    /// ```ignore
    /// TestCase::new("shows the footer", |ctx| Box::pin(async move {
    ///     ctx.visit("/blocks").await?;
    ///     ctx.contains("records").await?;
    ///     Ok(())
    /// }))
    /// ```
    #[must_use]
    pub fn new<F>(description: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut PageContext) -> CaseFuture<'a> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            body: Arc::new(body),
        }
    }

    /// Run the body against `ctx`
    pub fn run<'a>(&self, ctx: &'a mut PageContext) -> CaseFuture<'a> {
        (self.body)(ctx)
    }
}

/// Expand a data table into `(description, row)` pairs
///
/// Rows are kept in table order. A description already emitted gets ` (#n)`
/// appended, `n` being the lowest occurrence number not yet taken.
pub fn cases_from_table<T, I, D>(table: I, describe: D) -> Vec<(String, T)>
where
    I: IntoIterator<Item = T>,
    D: Fn(&T) -> String,
{
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut emitted: HashSet<String> = HashSet::new();
    table
        .into_iter()
        .map(|row| {
            let base = describe(&row);
            let n = occurrences.entry(base.clone()).or_insert(0);
            *n += 1;
            let mut description = if *n == 1 {
                base.clone()
            } else {
                format!("{base} (#{n})")
            };
            while emitted.contains(&description) {
                *n += 1;
                description = format!("{base} (#{n})");
            }
            emitted.insert(description.clone());
            (description, row)
        })
        .collect()
}

/// A test suite containing multiple tests
#[derive(Debug, Clone)]
pub struct TestSuite {
    /// Suite name
    pub name: String,
    /// Selection tags
    pub tags: BTreeSet<String>,
    /// Tests in this suite
    pub tests: Vec<TestCase>,
}

impl TestSuite {
    /// Create a new test suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeSet::new(),
            tests: Vec::new(),
        }
    }

    /// Add selection tags
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Register a case
    #[must_use]
    pub fn case<F>(mut self, description: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a mut PageContext) -> CaseFuture<'a> + Send + Sync + 'static,
    {
        self.tests.push(TestCase::new(description, body));
        self
    }

    /// Add a test case
    pub fn add_test(&mut self, test: TestCase) {
        self.tests.push(test);
    }

    /// Register one case per row of `table`
    ///
    /// Each case receives its own clone of the row.
    #[must_use]
    pub fn parametrized<T, I, D, F>(mut self, table: I, describe: D, body: F) -> Self
    where
        T: Clone + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        D: Fn(&T) -> String,
        F: for<'a> Fn(&'a mut PageContext, T) -> CaseFuture<'a> + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        for (description, row) in cases_from_table(table, describe) {
            let body = Arc::clone(&body);
            self.tests.push(TestCase::new(description, move |ctx| {
                (*body)(ctx, row.clone())
            }));
        }
        self
    }

    /// Get the number of tests
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Whether the suite carries `tag`
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Check that case descriptions are unique
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::DuplicateCase`] for the first repeated description
    pub fn validate(&self) -> HarnessResult<()> {
        let mut seen = HashSet::new();
        for test in &self.tests {
            if !seen.insert(test.description.as_str()) {
                return Err(HarnessError::DuplicateCase {
                    suite: self.name.clone(),
                    description: test.description.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Define a suite in closure style
///
/// ```ignore
/// define_suite(["@CI"], "block analytic tab", |suite| {
///     suite.case("contains the correct elements", |ctx| Box::pin(async move { Ok(()) }))
/// })
/// ```
#[must_use]
pub fn define_suite<I, S, F>(tags: I, name: impl Into<String>, build: F) -> TestSuite
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    F: FnOnce(TestSuite) -> TestSuite,
{
    build(TestSuite::new(name).with_tags(tags))
}

/// Check a whole run's suites: unique names, unique case descriptions
///
/// # Errors
///
/// Returns [`HarnessError::DuplicateSuite`] or [`HarnessError::DuplicateCase`]
pub fn validate_suites(suites: &[TestSuite]) -> HarnessResult<()> {
    let mut names = HashSet::new();
    for suite in suites {
        if !names.insert(suite.name.as_str()) {
            return Err(HarnessError::DuplicateSuite {
                name: suite.name.clone(),
            });
        }
        suite.validate()?;
    }
    Ok(())
}

/// Requested tags; a suite is selected if it carries any of them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagFilter {
    tags: BTreeSet<String>,
}

impl TagFilter {
    /// Filter on the given tags
    #[must_use]
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Filter that selects every suite
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether no tags were requested
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Requested tags
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Whether a suite tagged `suite_tags` is eligible
    #[must_use]
    pub fn matches(&self, suite_tags: &BTreeSet<String>) -> bool {
        self.tags.is_empty() || !self.tags.is_disjoint(suite_tags)
    }

    /// Whether `suite` is eligible
    #[must_use]
    pub fn selects(&self, suite: &TestSuite) -> bool {
        self.matches(&suite.tags)
    }
}

/// Display name of a case inside its suite
#[must_use]
pub fn full_name(suite: &str, case: &str) -> String {
    format!("{suite} › {case}")
}

/// Runner settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Cases run concurrently
    pub jobs: usize,
    /// Extra attempts for a failed case
    pub retries: u32,
    /// Limit on one attempt of one case
    pub case_timeout: Option<Duration>,
    /// Substring filter on `suite › case`
    pub name_filter: Option<String>,
    /// Suite selection
    pub tags: TagFilter,
    /// Settings for every page context
    pub context: ContextConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            retries: 0,
            case_timeout: None,
            name_filter: None,
            tags: TagFilter::all(),
            context: ContextConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set concurrency (at least 1)
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Set case-level retries
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the per-attempt time limit
    #[must_use]
    pub const fn with_case_timeout(mut self, timeout: Duration) -> Self {
        self.case_timeout = Some(timeout);
        self
    }

    /// Set the name filter
    #[must_use]
    pub fn with_name_filter(mut self, filter: impl Into<String>) -> Self {
        self.name_filter = Some(filter.into());
        self
    }

    /// Set the tag filter
    #[must_use]
    pub fn with_tags(mut self, tags: TagFilter) -> Self {
        self.tags = tags;
        self
    }

    /// Set the page context settings
    #[must_use]
    pub fn with_context(mut self, context: ContextConfig) -> Self {
        self.context = context;
        self
    }
}

/// Final state of a case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    /// Every step succeeded
    Passed,
    /// First unrecovered error
    Failed(String),
}

/// Result of running a single test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Suite name
    pub suite: String,
    /// Test name
    pub name: String,
    /// Verdict
    pub verdict: Verdict,
    /// Attempts used (1 unless retried)
    pub attempts: u32,
    /// Test duration, all attempts included
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
}

impl TestResult {
    /// Whether the case passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }

    /// Failure reason, if failed
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::Passed => None,
            Verdict::Failed(reason) => Some(reason),
        }
    }

    /// `suite › case`
    #[must_use]
    pub fn full_name(&self) -> String {
        full_name(&self.suite, &self.name)
    }
}

/// Results from running a test suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteResults {
    /// Suite name
    pub suite_name: String,
    /// Suite tags
    pub tags: BTreeSet<String>,
    /// Individual test results, in definition order
    pub results: Vec<TestResult>,
    /// Summed case durations
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
}

impl SuiteResults {
    /// Check if all tests passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(TestResult::passed)
    }

    /// Count passed tests
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Count failed tests
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed()).count()
    }

    /// Get total test count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get failed tests
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResult> {
        self.results.iter().filter(|r| !r.passed()).collect()
    }
}

/// Everything a run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// When the run started
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Wall-clock duration of the run
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    /// Selected suites, in definition order
    pub suites: Vec<SuiteResults>,
}

impl RunReport {
    /// Whether every selected case passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.suites.iter().all(SuiteResults::all_passed)
    }

    /// Total selected cases
    #[must_use]
    pub fn total(&self) -> usize {
        self.suites.iter().map(SuiteResults::total).sum()
    }

    /// Passed cases
    #[must_use]
    pub fn passed(&self) -> usize {
        self.suites.iter().map(SuiteResults::passed_count).sum()
    }

    /// Failed cases
    #[must_use]
    pub fn failed(&self) -> usize {
        self.suites.iter().map(SuiteResults::failed_count).sum()
    }

    /// Every case result, in order
    pub fn results(&self) -> impl Iterator<Item = &TestResult> {
        self.suites.iter().flat_map(|s| s.results.iter())
    }
}

/// Progress callbacks from a run
pub trait RunObserver: Send + Sync {
    /// Called once with the number of selected cases
    fn run_started(&self, _total: usize) {}

    /// Called when a case starts its first attempt
    fn case_started(&self, _suite: &str, _case: &str) {}

    /// Called when a case reaches its verdict
    fn case_finished(&self, _result: &TestResult) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// A selected suite and its selected cases
pub type Selection<'s> = Vec<(&'s TestSuite, Vec<&'s TestCase>)>;

/// Test harness for running suites
#[derive(Debug, Default)]
pub struct TestHarness {
    config: RunnerConfig,
}

impl TestHarness {
    /// Create a new test harness
    #[must_use]
    pub const fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Runner settings
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Apply tag and name filters; suites left with no cases are dropped
    #[must_use]
    pub fn select<'s>(&self, suites: &'s [TestSuite]) -> Selection<'s> {
        suites
            .iter()
            .filter(|suite| self.config.tags.selects(suite))
            .map(|suite| {
                let cases = suite
                    .tests
                    .iter()
                    .filter(|case| {
                        self.config.name_filter.as_deref().map_or(true, |needle| {
                            full_name(&suite.name, &case.description).contains(needle)
                        })
                    })
                    .collect::<Vec<_>>();
                (suite, cases)
            })
            .filter(|(_, cases)| !cases.is_empty())
            .collect()
    }

    /// Run every selected case
    ///
    /// Case failures never abort the run; they become verdicts.
    ///
    /// # Errors
    ///
    /// Returns error only for invalid suite definitions
    pub async fn run(
        &self,
        suites: &[TestSuite],
        pages: &dyn PageFactory,
        observer: &dyn RunObserver,
    ) -> HarnessResult<RunReport> {
        validate_suites(suites)?;
        let started_at = chrono::Utc::now();
        let start = Instant::now();

        let selection = self.select(suites);
        let queue: Vec<(&TestSuite, &TestCase)> = selection
            .iter()
            .flat_map(|(suite, cases)| cases.iter().map(move |case| (*suite, *case)))
            .collect();
        info!(
            suites = selection.len(),
            cases = queue.len(),
            jobs = self.config.jobs,
            "starting run"
        );
        observer.run_started(queue.len());

        let pending: Vec<_> = queue
            .into_iter()
            .enumerate()
            .map(|(order, (suite, case))| {
                let case = self.run_case(suite, case, pages, observer);
                async move { (order, case.await) }
            })
            .collect();
        let mut finished: Vec<(usize, TestResult)> = stream::iter(pending)
            .buffer_unordered(self.config.jobs.max(1))
            .collect()
            .await;
        finished.sort_by_key(|(order, _)| *order);

        let mut results = finished.into_iter().map(|(_, result)| result);
        let suites = selection
            .iter()
            .map(|(suite, cases)| {
                let results: Vec<TestResult> = results.by_ref().take(cases.len()).collect();
                SuiteResults {
                    suite_name: suite.name.clone(),
                    tags: suite.tags.clone(),
                    duration: results.iter().map(|r| r.duration).sum(),
                    results,
                }
            })
            .collect();

        let report = RunReport {
            started_at,
            duration: start.elapsed(),
            suites,
        };
        info!(
            passed = report.passed(),
            failed = report.failed(),
            "run finished"
        );
        Ok(report)
    }

    async fn run_case(
        &self,
        suite: &TestSuite,
        case: &TestCase,
        pages: &dyn PageFactory,
        observer: &dyn RunObserver,
    ) -> TestResult {
        observer.case_started(&suite.name, &case.description);
        let start = Instant::now();
        let mut attempts = 0;

        let verdict = loop {
            attempts += 1;
            match self.attempt(case, pages).await {
                Ok(()) => break Verdict::Passed,
                Err(e) if attempts <= self.config.retries => {
                    warn!(suite = %suite.name, case = %case.description, attempts, error = %e, "case failed; retrying");
                }
                Err(e) => break Verdict::Failed(e.to_string()),
            }
        };

        let result = TestResult {
            suite: suite.name.clone(),
            name: case.description.clone(),
            verdict,
            attempts,
            duration: start.elapsed(),
        };
        match result.error() {
            None => info!(case = %result.full_name(), attempts, "passed"),
            Some(reason) => info!(case = %result.full_name(), attempts, %reason, "failed"),
        }
        observer.case_finished(&result);
        result
    }

    async fn attempt(&self, case: &TestCase, pages: &dyn PageFactory) -> HarnessResult<()> {
        let page = pages.new_page().await?;
        let mut ctx = PageContext::new(page, self.config.context.clone());
        debug!(context = %ctx.id(), case = %case.description, "attempt");

        let body = AssertUnwindSafe(case.run(&mut ctx))
            .catch_unwind()
            .map(|caught| {
                caught.unwrap_or_else(|payload| Err(HarnessError::case_panicked(&*payload)))
            });
        let outcome = match self.config.case_timeout {
            Some(limit) => tokio::time::timeout(limit, body)
                .await
                .unwrap_or_else(|_| {
                    Err(HarnessError::CaseTimeout {
                        ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    })
                }),
            None => body.await,
        };

        if let Err(e) = ctx.close().await {
            debug!(context = %ctx.id(), error = %e, "page close failed");
        }
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::assertion::{Expectation, RetryBudget};
    use crate::driver::{MockElement, MockRoute, MockSite};
    use crate::locator::Locator;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn passing(description: &str) -> TestCase {
        TestCase::new(description, |_ctx| Box::pin(async { Ok(()) }))
    }

    fn failing(description: &str) -> TestCase {
        TestCase::new(description, |_ctx| {
            Box::pin(async { Err(HarnessError::page("boom")) })
        })
    }

    fn site() -> MockSite {
        MockSite::new().route(
            MockRoute::new("/blocks").element(MockElement::new("footer", "Showing 1 to 2 of 2 records")),
        )
    }

    fn fast_config() -> RunnerConfig {
        RunnerConfig::new().with_context(
            ContextConfig::new("http://explorer.test").with_budget(RetryBudget::from_millis(100, 10)),
        )
    }

    mod definition_tests {
        use super::*;

        #[test]
        fn test_suite_builder() {
            let suite = TestSuite::new("block analytic tab")
                .with_tags(["@CI"])
                .case("a", |_ctx| Box::pin(async { Ok(()) }))
                .case("b", |_ctx| Box::pin(async { Ok(()) }));
            assert_eq!(suite.test_count(), 2);
            assert!(suite.has_tag("@CI"));
            assert!(!suite.has_tag("@ci"));
            assert!(suite.validate().is_ok());
        }

        #[test]
        fn test_define_suite() {
            let suite = define_suite(["@CI", "@nightly"], "empty table", |suite| {
                suite.case("x", |_ctx| Box::pin(async { Ok(()) }))
            });
            assert_eq!(suite.name, "empty table");
            assert_eq!(suite.tags.len(), 2);
            assert_eq!(suite.tests[0].description, "x");
        }

        #[test]
        fn test_validate_rejects_duplicate_case() {
            let mut suite = TestSuite::new("s");
            suite.add_test(passing("same"));
            suite.add_test(passing("same"));
            assert!(matches!(
                suite.validate(),
                Err(HarnessError::DuplicateCase { .. })
            ));
        }

        #[test]
        fn test_validate_suites_rejects_duplicate_names() {
            let suites = vec![TestSuite::new("s"), TestSuite::new("s")];
            assert!(matches!(
                validate_suites(&suites),
                Err(HarnessError::DuplicateSuite { .. })
            ));
        }

        #[test]
        fn test_cases_from_table_disambiguates_repeats() {
            let cases = cases_from_table(["/blocks", "/blocks", "/x", "/blocks"], |p| {
                format!("is navigated to from {p}")
            });
            let names: Vec<_> = cases.iter().map(|(d, _)| d.as_str()).collect();
            assert_eq!(
                names,
                vec![
                    "is navigated to from /blocks",
                    "is navigated to from /blocks (#2)",
                    "is navigated to from /x",
                    "is navigated to from /blocks (#3)",
                ]
            );
        }

        #[test]
        fn test_parametrized_generates_one_case_per_row() {
            let suite = TestSuite::new("empty table").parametrized(
                vec!["/a".to_string(), "/b".to_string()],
                |p| format!("on {p} shows as having zero records"),
                |ctx, path| {
                    Box::pin(async move {
                        ctx.visit(&path).await?;
                        Ok(())
                    })
                },
            );
            assert_eq!(suite.test_count(), 2);
            assert_eq!(suite.tests[1].description, "on /b shows as having zero records");
            assert!(suite.validate().is_ok());
        }
    }

    mod tag_filter_tests {
        use super::*;

        #[test]
        fn test_empty_filter_selects_everything() {
            assert!(TagFilter::all().selects(&TestSuite::new("untagged")));
        }

        #[test]
        fn test_or_semantics() {
            let suite = TestSuite::new("s").with_tags(["@CI"]);
            assert!(TagFilter::new(["@CI"]).selects(&suite));
            assert!(TagFilter::new(["@nightly", "@CI"]).selects(&suite));
            assert!(!TagFilter::new(["@nightly"]).selects(&suite));
            assert!(!TagFilter::new(["@ci"]).selects(&suite));
        }

        #[test]
        fn test_cases_from_table_skips_taken_suffixes() {
            let names: Vec<String> = cases_from_table(["a", "a", "a (#2)"], |r| (*r).to_string())
                .into_iter()
                .map(|(d, _)| d)
                .collect();
            assert_eq!(names, vec!["a", "a (#2)", "a (#2) (#2)"]);

            let names: Vec<String> = cases_from_table(["a", "a (#2)", "a"], |r| (*r).to_string())
                .into_iter()
                .map(|(d, _)| d)
                .collect();
            assert_eq!(names, vec!["a", "a (#2)", "a (#3)"]);

            let suite = TestSuite::new("s").parametrized(
                ["a", "a", "a (#2)"],
                |r| (*r).to_string(),
                |_ctx, _row| Box::pin(async { Ok(()) }),
            );
            assert!(suite.validate().is_ok());
        }

        proptest! {
            #[test]
            fn prop_table_descriptions_unique(
                rows in proptest::collection::vec("a|b|a \\(#2\\)|a \\(#3\\)", 0..8),
            ) {
                let cases = cases_from_table(rows.clone(), Clone::clone);
                let unique: HashSet<&String> = cases.iter().map(|(d, _)| d).collect();
                prop_assert_eq!(unique.len(), rows.len());
            }

            #[test]
            fn prop_selected_iff_tags_intersect(
                requested in proptest::collection::btree_set("[a-c]", 0..3),
                suite_tags in proptest::collection::btree_set("[a-c]", 0..3),
            ) {
                let filter = TagFilter::new(requested.clone());
                let expected = requested.is_empty() || requested.iter().any(|t| suite_tags.contains(t));
                prop_assert_eq!(filter.matches(&suite_tags), expected);
            }
        }
    }

    mod selection_tests {
        use super::*;

        #[test]
        fn test_name_filter_and_empty_suites() {
            let mut a = TestSuite::new("block spotlight").with_tags(["@CI"]);
            a.add_test(passing("is navigated to from /blocks"));
            a.add_test(passing("is navigated to from /commands"));
            let mut b = TestSuite::new("empty table").with_tags(["@CI"]);
            b.add_test(passing("on /snarks shows as having zero records"));
            let suites = vec![a, b];

            let harness = TestHarness::new(RunnerConfig::new().with_name_filter("spotlight › is navigated to from /blocks"));
            let selection = harness.select(&suites);
            assert_eq!(selection.len(), 1);
            assert_eq!(selection[0].1.len(), 1);
        }
    }

    mod run_tests {
        use super::*;

        #[derive(Default)]
        struct Recorder {
            started: AtomicUsize,
            finished: Mutex<Vec<String>>,
        }

        impl RunObserver for Recorder {
            fn run_started(&self, total: usize) {
                self.started.store(total, Ordering::SeqCst);
            }

            fn case_finished(&self, result: &TestResult) {
                self.finished.lock().unwrap().push(result.name.clone());
            }
        }

        #[tokio::test]
        async fn test_failure_does_not_abort_run() {
            let mut suite = TestSuite::new("mixed");
            suite.add_test(failing("first"));
            suite.add_test(passing("second"));
            let site = site();
            let report = TestHarness::new(fast_config())
                .run(&[suite], &site, &NoopObserver)
                .await
                .unwrap();
            assert_eq!(report.total(), 2);
            assert_eq!(report.failed(), 1);
            assert!(!report.all_passed());
            assert!(report.suites[0].results[0]
                .error()
                .unwrap()
                .contains("boom"));
            assert_eq!(site.pages_opened(), 2);
        }

        #[tokio::test]
        async fn test_panicking_case_fails_alone() {
            let mut suite = TestSuite::new("mixed");
            suite.add_test(TestCase::new("asserts", |_ctx| {
                Box::pin(async {
                    let tiles: Vec<u32> = Vec::new();
                    assert_eq!(tiles.len(), 4, "tiles missing");
                    Ok(())
                })
            }));
            suite.add_test(passing("sibling"));
            let site = site();
            let report = TestHarness::new(fast_config().with_jobs(2))
                .run(&[suite], &site, &NoopObserver)
                .await
                .unwrap();

            let results = &report.suites[0].results;
            let reason = results[0].error().unwrap();
            assert!(reason.starts_with("panicked: "), "{reason}");
            assert!(reason.contains("tiles missing"), "{reason}");
            assert!(results[1].passed());
            assert_eq!(site.pages_opened(), 2);
        }

        #[tokio::test]
        async fn test_run_can_be_spawned() {
            let mut suite = TestSuite::new("spawned");
            suite.add_test(passing("a"));
            suite.add_test(passing("b"));
            let harness = TestHarness::new(fast_config().with_jobs(2));
            let site = site();
            let report = tokio::spawn(async move {
                harness.run(&[suite], &site, &NoopObserver).await
            })
            .await
            .unwrap()
            .unwrap();
            assert_eq!(report.passed(), 2);
        }

        #[tokio::test]
        async fn test_tag_filter_excludes_suites() {
            let mut ci = TestSuite::new("ci").with_tags(["@CI"]);
            ci.add_test(passing("x"));
            let mut nightly = TestSuite::new("nightly").with_tags(["@nightly"]);
            nightly.add_test(passing("y"));
            let report = TestHarness::new(fast_config().with_tags(TagFilter::new(["@CI"])))
                .run(&[ci, nightly], &site(), &NoopObserver)
                .await
                .unwrap();
            assert_eq!(report.suites.len(), 1);
            assert_eq!(report.suites[0].suite_name, "ci");
        }

        #[tokio::test]
        async fn test_results_keep_definition_order_under_concurrency() {
            let mut suite = TestSuite::new("ordered");
            for (name, delay) in [("slow", 120_u64), ("medium", 60), ("fast", 0)] {
                suite.add_test(TestCase::new(name, move |_ctx| {
                    Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        Ok(())
                    })
                }));
            }
            let recorder = Recorder::default();
            let report = TestHarness::new(fast_config().with_jobs(3))
                .run(&[suite], &site(), &recorder)
                .await
                .unwrap();

            let names: Vec<_> = report.results().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["slow", "medium", "fast"]);
            assert_eq!(recorder.started.load(Ordering::SeqCst), 3);
            assert_eq!(
                recorder.finished.lock().unwrap().first().map(String::as_str),
                Some("fast")
            );
        }

        #[tokio::test]
        async fn test_retries_use_fresh_context() {
            let calls = Arc::new(AtomicUsize::new(0));
            let seen = Arc::clone(&calls);
            let mut suite = TestSuite::new("flaky");
            suite.add_test(TestCase::new("eventually", move |_ctx| {
                let n = seen.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    if n == 0 {
                        Err(HarnessError::page("transient"))
                    } else {
                        Ok(())
                    }
                })
            }));
            let site = site();
            let report = TestHarness::new(fast_config().with_retries(1))
                .run(&[suite], &site, &NoopObserver)
                .await
                .unwrap();
            let result = report.results().next().unwrap();
            assert!(result.passed());
            assert_eq!(result.attempts, 2);
            assert_eq!(site.pages_opened(), 2);
        }

        #[tokio::test]
        async fn test_case_timeout() {
            let mut suite = TestSuite::new("hang");
            suite.add_test(TestCase::new("forever", |ctx| {
                Box::pin(async move {
                    ctx.wait_fixed(Duration::from_secs(5)).await;
                    Ok(())
                })
            }));
            let report = TestHarness::new(fast_config().with_case_timeout(Duration::from_millis(50)))
                .run(&[suite], &site(), &NoopObserver)
                .await
                .unwrap();
            let reason = report.results().next().unwrap().error().unwrap().to_string();
            assert!(reason.contains("timed out after 50ms"));
        }

        #[tokio::test]
        async fn test_assertion_failure_carries_diagnostic() {
            let mut suite = TestSuite::new("analytics");
            suite.add_test(TestCase::new("counts", |ctx| {
                Box::pin(async move {
                    ctx.visit("/blocks").await?;
                    ctx.expect(&Locator::new("analytics-sm"), &Expectation::length(4))
                        .await?;
                    Ok(())
                })
            }));
            let report = TestHarness::new(fast_config())
                .run(&[suite], &site(), &NoopObserver)
                .await
                .unwrap();
            let reason = report.results().next().unwrap().error().unwrap().to_string();
            assert!(reason.contains("analytics-sm"));
            assert!(reason.contains("have length 4"));
            assert!(reason.contains("0 elements"));
        }

        #[tokio::test]
        async fn test_duplicate_suites_abort_before_running() {
            let site = site();
            let err = TestHarness::new(fast_config())
                .run(&[TestSuite::new("x"), TestSuite::new("x")], &site, &NoopObserver)
                .await
                .unwrap_err();
            assert!(matches!(err, HarnessError::DuplicateSuite { .. }));
            assert_eq!(site.pages_opened(), 0);
        }

        #[test]
        fn test_verdict_serializes_with_status() {
            let json = serde_json::to_string(&Verdict::Failed("x".into())).unwrap();
            assert_eq!(json, r#"{"status":"failed","reason":"x"}"#);
            let json = serde_json::to_string(&Verdict::Passed).unwrap();
            assert_eq!(json, r#"{"status":"passed"}"#);
        }
    }
}
