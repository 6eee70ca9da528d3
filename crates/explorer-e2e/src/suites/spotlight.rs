//! Block spotlight reached by clicking block links on other pages.

use super::{SuiteParams, CI_TAG};
use crate::harness::{define_suite, TestSuite};
use crate::locator::Locator;
use crate::navigation::{navigate_and_expect, NavigationCheck};

/// Block links, excluding the per-account block listing
pub const BLOCK_LINK: &str = r#"a[href^="/blocks/"]:not(a[href^="/blocks/account"])"#;

/// Any link into `/blocks/`
pub const ANY_BLOCK_LINK: &str = r#"a[href^="/blocks/"]"#;

/// URL fragment every block spotlight carries
pub const SPOTLIGHT_FRAGMENT: &str = "/blocks/";

/// A page to start from and the links on it that lead to a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotlightRow {
    /// Origin path
    pub origin: String,
    /// CSS selector of the block links
    pub selector: &'static str,
}

/// The origins checked by `block spotlight`, in order
#[must_use]
pub fn spotlight_rows(account_pk: &str) -> Vec<SpotlightRow> {
    let row = |origin: String, selector| SpotlightRow { origin, selector };
    vec![
        row("/blocks".to_string(), BLOCK_LINK),
        row("/blocks".to_string(), BLOCK_LINK),
        row(format!("/addresses/accounts/{account_pk}"), BLOCK_LINK),
        row("/commands/internal-commands".to_string(), ANY_BLOCK_LINK),
    ]
}

/// `block spotlight`: following a block link from each origin lands on `/blocks/`
#[must_use]
pub fn block_spotlight(params: &SuiteParams) -> TestSuite {
    let settle = params.settle;
    define_suite([CI_TAG], "block spotlight", |suite| {
        suite.parametrized(
            spotlight_rows(&params.account_pk),
            |row| format!("is navigated to from {}", row.origin),
            move |ctx, row| {
                let mut check =
                    NavigationCheck::new(row.origin, Locator::new(row.selector), SPOTLIGHT_FRAGMENT);
                check.settle = settle;
                Box::pin(async move {
                    navigate_and_expect(ctx, &check).await?;
                    Ok(())
                })
            },
        )
    })
}
