//! Per-test-case page context.
//!
//! A [`PageContext`] owns one page for the duration of one test case. All
//! actions and assertions go through it, and every query re-resolves the
//! locator against the live document.

use crate::assertion::{
    poll_until, AssertionCheckResult, Expectation, Observation, RetryBudget, RetryOutcome,
};
use crate::driver::PageDriver;
use crate::locator::{ClickOptions, Locator};
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Default application URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:5274";

const NO_MATCH: &str = "0 elements";
const HIDDEN_MATCH: &str = "matched element has no layout box";

/// Settings shared by every context of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Base URL relative paths resolve against
    pub base_url: String,
    /// Budget for assertions that don't pass their own
    pub budget: RetryBudget,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            budget: RetryBudget::default(),
        }
    }
}

impl ContextConfig {
    /// Create a config for `base_url` with the default budget
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            budget: RetryBudget::default(),
        }
    }

    /// Set the default assertion budget
    #[must_use]
    pub const fn with_budget(mut self, budget: RetryBudget) -> Self {
        self.budget = budget;
        self
    }
}

/// Join `path` onto `base`, passing absolute URLs through
///
/// # Errors
///
/// Returns [`HarnessError::InvalidUrl`] if the base URL is not http(s) or
/// the path contains whitespace
pub fn resolve_url(base: &str, path: &str) -> HarnessResult<String> {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("about:") {
        return Ok(path.to_string());
    }
    if path.chars().any(char::is_whitespace) {
        return Err(HarnessError::InvalidUrl {
            url: path.to_string(),
            message: "path contains whitespace".to_string(),
        });
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(HarnessError::InvalidUrl {
            url: base.to_string(),
            message: "base URL must start with http:// or https://".to_string(),
        });
    }
    Ok(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

/// One test case's exclusive page plus run settings
pub struct PageContext {
    id: String,
    page: Box<dyn PageDriver>,
    config: ContextConfig,
    closed: bool,
}

impl fmt::Debug for PageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageContext")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl PageContext {
    /// Wrap a freshly opened page
    #[must_use]
    pub fn new(page: Box<dyn PageDriver>, config: ContextConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            page,
            config,
            closed: false,
        }
    }

    /// Unique context ID
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Base URL of the application under test
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Default assertion budget
    #[must_use]
    pub const fn budget(&self) -> RetryBudget {
        self.config.budget
    }

    /// Resolve a path against the base URL
    ///
    /// # Errors
    ///
    /// Returns error if the URL cannot be built
    pub fn resolve_url(&self, path: &str) -> HarnessResult<String> {
        resolve_url(&self.config.base_url, path)
    }

    /// Navigate to a path or absolute URL; does not wait for rendering
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the page fails to load
    pub async fn visit(&mut self, path: &str) -> HarnessResult<()> {
        let url = self.resolve_url(path)?;
        debug!(context = %self.id, %url, "visit");
        self.page.navigate(&url).await
    }

    /// Current page URL
    ///
    /// # Errors
    ///
    /// Returns error if the driver cannot report it
    pub async fn current_url(&self) -> HarnessResult<String> {
        self.page.current_url().await
    }

    /// Take one observation of `locator`
    ///
    /// Driver failures become [`Observation::Unavailable`] rather than errors.
    pub async fn observe(&self, locator: &Locator) -> Observation {
        match self.page.query_all(locator.selector()).await {
            Ok(found) => Observation::elements(
                locator
                    .narrow(found)
                    .into_iter()
                    .map(|e| e.text_content),
            ),
            Err(e) => Observation::Unavailable(e.to_string()),
        }
    }

    async fn observe_url(&self) -> Observation {
        match self.page.current_url().await {
            Ok(url) => Observation::Url(url),
            Err(e) => Observation::Unavailable(e.to_string()),
        }
    }

    /// Poll until `locator` satisfies `expectation`, with the default budget
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::AssertionTimeout`] if the budget runs out
    pub async fn expect(
        &self,
        locator: &Locator,
        expectation: &Expectation,
    ) -> HarnessResult<RetryOutcome> {
        self.expect_with(locator, expectation, self.config.budget)
            .await
    }

    /// Poll until `locator` satisfies `expectation` within `budget`
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::AssertionTimeout`] if the budget runs out
    pub async fn expect_with(
        &self,
        locator: &Locator,
        expectation: &Expectation,
        budget: RetryBudget,
    ) -> HarnessResult<RetryOutcome> {
        debug!(context = %self.id, %locator, %expectation, "expect");
        let outcome = poll_until(budget, move || async move {
            if expectation.is_url() {
                expectation.check(&self.observe_url().await)
            } else {
                expectation.check(&self.observe(locator).await)
            }
        })
        .await;

        outcome.map_err(|e| HarnessError::AssertionTimeout {
            locator: locator.to_string(),
            predicate: expectation.to_string(),
            last_observed: e.message,
            attempts: e.attempts,
            elapsed_ms: millis(e.duration),
        })
    }

    /// Poll until the current URL satisfies `expectation`, with the default budget
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::AssertionTimeout`] if the budget runs out
    pub async fn expect_url(&self, expectation: &Expectation) -> HarnessResult<RetryOutcome> {
        self.expect_url_with(expectation, self.config.budget).await
    }

    /// Poll until the current URL satisfies `expectation` within `budget`
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::AssertionTimeout`] if the budget runs out
    pub async fn expect_url_with(
        &self,
        expectation: &Expectation,
        budget: RetryBudget,
    ) -> HarnessResult<RetryOutcome> {
        debug!(context = %self.id, %expectation, "expect url");
        poll_until(budget, move || async move {
            expectation.check(&self.observe_url().await)
        })
        .await
        .map_err(|e| HarnessError::AssertionTimeout {
            locator: "url".to_string(),
            predicate: expectation.to_string(),
            last_observed: e.message,
            attempts: e.attempts,
            elapsed_ms: millis(e.duration),
        })
    }

    /// Expect some element's text to contain `text`
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::AssertionTimeout`] if the text never appears
    pub async fn contains(&self, text: &str) -> HarnessResult<RetryOutcome> {
        self.expect(&Locator::text(text), &Expectation::NotEmpty)
            .await
    }

    /// Click the first match of `locator` (or its indexed match)
    ///
    /// Waits up to `options.timeout` for a target. A non-forced click also
    /// requires the target to be visible. A forced click that finds nothing
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ElementNotFound`] or
    /// [`HarnessError::ElementNotInteractable`] for non-forced clicks, or a
    /// driver error from the click itself
    pub async fn click(&mut self, locator: &Locator, options: ClickOptions) -> HarnessResult<()> {
        let budget = RetryBudget::new(options.timeout)
            .with_poll_interval(self.config.budget.poll_interval);
        let force = options.force;
        let this = &*self;

        let ready = poll_until(budget, move || async move {
            match this.page.query_all(locator.selector()).await {
                Ok(found) => match locator.narrow(found).first() {
                    None => AssertionCheckResult::Fail(NO_MATCH.to_string()),
                    Some(target) if !force && !target.visible => {
                        AssertionCheckResult::Fail(HIDDEN_MATCH.to_string())
                    }
                    Some(_) => AssertionCheckResult::Pass,
                },
                Err(e) => AssertionCheckResult::Fail(e.to_string()),
            }
        })
        .await;

        if let Err(e) = ready {
            let waited_ms = millis(e.duration);
            if force {
                warn!(context = %self.id, %locator, waited_ms, "forced click found no target; skipping");
                return Ok(());
            }
            let locator = locator.to_string();
            return Err(if e.message == HIDDEN_MATCH {
                HarnessError::ElementNotInteractable { locator, waited_ms }
            } else {
                HarnessError::ElementNotFound { locator, waited_ms }
            });
        }

        debug!(context = %self.id, %locator, force, "click");
        self.page
            .click(locator.selector(), locator.index().unwrap_or(0), force)
            .await
    }

    /// Sleep for a fixed duration regardless of page state
    pub async fn wait_fixed(&self, duration: Duration) {
        debug!(context = %self.id, ?duration, "fixed wait");
        tokio::time::sleep(duration).await;
    }

    /// Close the page; later calls are no-ops
    ///
    /// # Errors
    ///
    /// Returns error if the driver fails to close the page
    pub async fn close(&mut self) -> HarnessResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.page.close().await
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockElement, MockRoute, MockSite};
    use std::time::Instant;

    const BASE: &str = "http://explorer.test";

    fn site() -> MockSite {
        MockSite::new()
            .route(
                MockRoute::new("/blocks")
                    .element(MockElement::link(["a.block"], "/blocks/3NKabc", "3NKabc"))
                    .element(MockElement::link(["a.block"], "/blocks/3NKdef", "3NKdef"))
                    .element(MockElement::new("button.hidden", "Hidden").hidden()),
            )
            .route(
                MockRoute::new("/lazy")
                    .element(MockElement::new("footer", "Showing 0 to 0 of 0 records"))
                    .render_after(Duration::from_millis(150)),
            )
            .route(MockRoute::new("/blocks/*").element(MockElement::new("h1", "Spotlight")))
    }

    fn context(site: &MockSite, budget: RetryBudget) -> PageContext {
        PageContext::new(
            Box::new(site.open()),
            ContextConfig::new(BASE).with_budget(budget),
        )
    }

    mod resolve_url_tests {
        use super::*;

        #[test]
        fn test_joins_relative_paths() {
            assert_eq!(
                resolve_url("http://localhost:5274/", "/blocks").unwrap(),
                "http://localhost:5274/blocks"
            );
            assert_eq!(
                resolve_url("http://localhost:5274", "snarks?q-state-hash=3Nfake").unwrap(),
                "http://localhost:5274/snarks?q-state-hash=3Nfake"
            );
        }

        #[test]
        fn test_absolute_urls_pass_through() {
            assert_eq!(
                resolve_url(BASE, "https://other.test/x").unwrap(),
                "https://other.test/x"
            );
            assert_eq!(resolve_url(BASE, "about:blank").unwrap(), "about:blank");
        }

        #[test]
        fn test_rejects_bad_input() {
            assert!(matches!(
                resolve_url("localhost:5274", "/blocks"),
                Err(HarnessError::InvalidUrl { .. })
            ));
            assert!(resolve_url(BASE, "/bad path").is_err());
        }
    }

    mod expect_tests {
        use super::*;

        #[tokio::test]
        async fn test_passes_first_attempt_without_sleeping() {
            let mut ctx = context(&site(), RetryBudget::from_millis(1000, 500));
            ctx.visit("/blocks").await.unwrap();
            let outcome = ctx
                .expect(&Locator::new("a.block"), &Expectation::length(2))
                .await
                .unwrap();
            assert_eq!(outcome.attempts, 1);
            assert!(outcome.duration < Duration::from_millis(250));
        }

        #[tokio::test]
        async fn test_waits_for_async_render() {
            let mut ctx = context(&site(), RetryBudget::from_millis(2000, 20));
            ctx.visit("/lazy").await.unwrap();
            let outcome = ctx.contains("Showing 0 to 0 of 0 records").await.unwrap();
            assert!(outcome.attempts > 1);
        }

        #[tokio::test]
        async fn test_timeout_reports_diagnostics() {
            let mut ctx = context(&site(), RetryBudget::from_millis(100, 20));
            ctx.visit("/blocks").await.unwrap();
            let start = Instant::now();
            let err = ctx
                .expect(&Locator::new("analytics-sm"), &Expectation::length(4))
                .await
                .unwrap_err();
            assert!(start.elapsed() < Duration::from_millis(120 + 200));
            match err {
                HarnessError::AssertionTimeout {
                    locator,
                    predicate,
                    last_observed,
                    attempts,
                    ..
                } => {
                    assert_eq!(locator, "analytics-sm");
                    assert_eq!(predicate, "have length 4");
                    assert_eq!(last_observed, "0 elements");
                    assert!(attempts > 1);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_index_filter_narrows_observation() {
            let mut ctx = context(&site(), RetryBudget::fast());
            ctx.visit("/blocks").await.unwrap();
            ctx.expect(
                &Locator::new("a.block").nth(1),
                &Expectation::TextEquals("3NKdef".into()),
            )
            .await
            .unwrap();
        }

        #[tokio::test]
        async fn test_expect_url() {
            let mut ctx = context(&site(), RetryBudget::fast());
            ctx.visit("/blocks").await.unwrap();
            ctx.expect_url(&Expectation::url_includes("/blocks"))
                .await
                .unwrap();
            let err = ctx
                .expect_url_with(
                    &Expectation::url_includes("/commands/"),
                    RetryBudget::from_millis(50, 10),
                )
                .await
                .unwrap_err();
            assert!(err.to_string().contains("waiting for url"));
        }

        #[tokio::test]
        async fn test_closed_page_is_an_unavailable_observation() {
            let mut ctx = context(&site(), RetryBudget::from_millis(50, 10));
            ctx.close().await.unwrap();
            let observed = ctx.observe(&Locator::new("a")).await;
            assert!(matches!(observed, Observation::Unavailable(_)));
        }
    }

    mod click_tests {
        use super::*;

        #[tokio::test]
        async fn test_forced_click_navigates_first_match() {
            let mut ctx = context(&site(), RetryBudget::fast());
            ctx.visit("/blocks").await.unwrap();
            ctx.click(&Locator::new("a.block").first(), ClickOptions::forced())
                .await
                .unwrap();
            assert_eq!(
                ctx.current_url().await.unwrap(),
                "http://explorer.test/blocks/3NKabc"
            );
        }

        #[tokio::test]
        async fn test_forced_click_without_match_is_noop() {
            let mut ctx = context(&site(), RetryBudget::fast());
            ctx.visit("/blocks").await.unwrap();
            ctx.click(
                &Locator::new("a.missing"),
                ClickOptions::forced().with_timeout(Duration::from_millis(50)),
            )
            .await
            .unwrap();
            assert_eq!(ctx.current_url().await.unwrap(), "http://explorer.test/blocks");
        }

        #[tokio::test]
        async fn test_click_missing_element() {
            let mut ctx = context(&site(), RetryBudget::fast());
            ctx.visit("/blocks").await.unwrap();
            let err = ctx
                .click(
                    &Locator::new("a.missing"),
                    ClickOptions::new().with_timeout(Duration::from_millis(50)),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, HarnessError::ElementNotFound { .. }));
        }

        #[tokio::test]
        async fn test_click_hidden_element() {
            let mut ctx = context(&site(), RetryBudget::fast());
            ctx.visit("/blocks").await.unwrap();
            let err = ctx
                .click(
                    &Locator::new("button.hidden"),
                    ClickOptions::new().with_timeout(Duration::from_millis(50)),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, HarnessError::ElementNotInteractable { .. }));

            ctx.click(&Locator::new("button.hidden"), ClickOptions::forced())
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_wait_fixed_sleeps() {
        let ctx = context(&site(), RetryBudget::fast());
        let start = Instant::now();
        ctx.wait_fixed(Duration::from_millis(30)).await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut ctx = context(&site(), RetryBudget::fast());
        ctx.close().await.unwrap();
        ctx.close().await.unwrap();
        assert!(!ctx.id().is_empty());
    }
}
