//! explorer-e2e: end-to-end harness for the blockchain explorer
//!
//! Drives a browser against a running explorer and checks what a user
//! sees: element counts, footer text, URLs after clicking through.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   tags    ┌──────────────┐  one page  ┌──────────────┐
//! │ TestSuite    │──────────►│ TestHarness  │───────────►│ PageContext  │
//! │ (cases+tags) │           │ (jobs,retry) │  per case  │ actions and  │
//! └──────────────┘           └──────────────┘            │ expectations │
//!                                                        └──────┬───────┘
//!                                                               │ PageDriver
//!                                              ┌────────────────┴──────────┐
//!                                              │ ChromiumDriver │ MockDriver│
//!                                              └───────────────────────────┘
//! ```
//!
//! Every expectation polls the live page until it holds or its
//! [`RetryBudget`] is spent; the explorer renders tables and links
//! asynchronously, so nothing is asserted from a single snapshot.

#![warn(missing_docs)]

mod assertion;
mod browser;
mod context;
mod driver;
mod harness;
mod locator;
mod navigation;
mod pagination;
mod reporter;
mod result;

/// The explorer's CI suites
pub mod suites;

pub use assertion::{
    poll_until, AssertionCheckResult, Expectation, Observation, RetryAssertion, RetryBudget,
    RetryError, RetryOutcome,
};
pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumFactory};
pub use context::{resolve_url, ContextConfig, PageContext, DEFAULT_BASE_URL};
pub use driver::{
    ElementHandle, MockDriver, MockElement, MockRoute, MockSite, PageDriver, PageFactory,
};
pub use harness::{
    cases_from_table, define_suite, full_name, validate_suites, CaseFuture, NoopObserver,
    RunObserver, RunReport, RunnerConfig, Selection, SuiteResults, TagFilter, TestCase,
    TestHarness, TestResult, TestSuite, Verdict,
};
pub use locator::{ClickOptions, Locator, Selector};
pub use navigation::{navigate_and_expect, NavigationCheck, NAVIGATION_TIMEOUT};
pub use pagination::RecordsFooter;
pub use reporter::{render, render_junit, summary, write_report, ReportFormat};
pub use result::{HarnessError, HarnessResult};
pub use suites::{explorer_suites, SuiteParams, CI_TAG};

/// Everything a suite author needs
pub mod prelude {
    pub use super::assertion::{Expectation, RetryBudget};
    pub use super::context::PageContext;
    pub use super::harness::{define_suite, CaseFuture, TestCase, TestSuite};
    pub use super::locator::{ClickOptions, Locator};
    pub use super::navigation::{navigate_and_expect, NavigationCheck};
    pub use super::result::{HarnessError, HarnessResult};
}
