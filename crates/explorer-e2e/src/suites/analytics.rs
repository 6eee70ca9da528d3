//! Block analytics tab.

use super::CI_TAG;
use crate::assertion::Expectation;
use crate::harness::{define_suite, TestSuite};
use crate::locator::Locator;

/// Small analytics tiles on the tab
pub const SMALL_TILE: &str = "analytics-sm";
/// Large analytics charts on the tab
pub const LARGE_TILE: &str = "analytics-lg";

/// Analytics tab path for a block
#[must_use]
pub fn analytics_path(state_hash: &str) -> String {
    format!("/blocks/{state_hash}/analytics")
}

/// `block analytic tab`: four small tiles and two large ones
#[must_use]
pub fn block_analytic_tab(state_hash: &str) -> TestSuite {
    let path = analytics_path(state_hash);
    define_suite([CI_TAG], "block analytic tab", move |suite| {
        suite.case("contains the correct elements", move |ctx| {
            let path = path.clone();
            Box::pin(async move {
                ctx.visit(&path).await?;
                ctx.expect(&Locator::new(SMALL_TILE), &Expectation::length(4))
                    .await?;
                ctx.expect(&Locator::new(LARGE_TILE), &Expectation::length(2))
                    .await?;
                Ok(())
            })
        })
    })
}
