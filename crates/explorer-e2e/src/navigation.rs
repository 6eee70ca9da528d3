//! Click-through navigation checks.
//!
//! Visit an origin page, click the first matching link, then wait for the
//! URL to change. Waiting is predicate-based: the click polls for its target
//! and the URL assertion polls for the fragment. Fixed settle waits are
//! available but off by default.

use crate::assertion::{Expectation, RetryBudget, RetryOutcome};
use crate::context::PageContext;
use crate::locator::{ClickOptions, Locator};
use crate::result::HarnessResult;
use std::time::Duration;
use tracing::debug;

/// Time allowed for the link to appear and for the URL to change
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(10);

/// One origin → link → destination check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationCheck {
    /// Page to start from
    pub origin: String,
    /// Link to follow; its first match is clicked
    pub link: Locator,
    /// Substring the destination URL must contain
    pub expected_url_fragment: String,
    /// Optional fixed wait after visiting and after clicking
    pub settle: Option<Duration>,
    /// Budget for link resolution and the URL assertion
    pub budget: RetryBudget,
}

impl NavigationCheck {
    /// Check that following `link` from `origin` lands on a URL containing `fragment`
    #[must_use]
    pub fn new(origin: impl Into<String>, link: impl Into<Locator>, fragment: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            link: link.into(),
            expected_url_fragment: fragment.into(),
            settle: None,
            budget: RetryBudget::new(NAVIGATION_TIMEOUT),
        }
    }

    /// Add a fixed wait after each page transition
    #[must_use]
    pub const fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = Some(settle);
        self
    }

    /// Override the budget
    #[must_use]
    pub const fn with_budget(mut self, budget: RetryBudget) -> Self {
        self.budget = budget;
        self
    }
}

/// Run a [`NavigationCheck`] on `ctx`
///
/// The click is forced: an overlay or off-screen position does not block it.
///
/// # Errors
///
/// Returns the first failing step's error: navigation, click, or the URL
/// assertion timing out
pub async fn navigate_and_expect(
    ctx: &mut PageContext,
    check: &NavigationCheck,
) -> HarnessResult<RetryOutcome> {
    debug!(origin = %check.origin, link = %check.link, "navigation check");
    ctx.visit(&check.origin).await?;
    if let Some(settle) = check.settle {
        ctx.wait_fixed(settle).await;
    }

    let target = check.link.clone().first();
    ctx.click(&target, ClickOptions::forced().with_timeout(check.budget.timeout))
        .await?;
    if let Some(settle) = check.settle {
        ctx.wait_fixed(settle).await;
    }

    ctx.expect_url_with(
        &Expectation::url_includes(check.expected_url_fragment.clone()),
        check.budget,
    )
    .await
}
