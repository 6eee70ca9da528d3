//! The explorer's CI suites.
//!
//! - `block analytic tab`: tile counts on a block's analytics tab
//! - `empty table`: zero-records footer on listings with no matches
//! - `block spotlight`: block links lead to a block's spotlight page

pub mod analytics;
pub mod empty_table;
pub mod spotlight;

use crate::harness::TestSuite;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use analytics::block_analytic_tab;
pub use empty_table::empty_table;
pub use spotlight::block_spotlight;

/// Tag carried by every suite that runs in CI
pub const CI_TAG: &str = "@CI";

/// Canonical block with analytics data
pub const DEFAULT_STATE_HASH: &str = "3NKdghxnw7vQmVmj1G3MK1PQXYU5dDH1BQV3cCjXjViPW47L6hHJ";

/// Account whose page lists blocks it produced
pub const DEFAULT_ACCOUNT_PK: &str = "B62qrCz3ehCqi8Pn8y3vWC9zYEB9RKsidauv15DeZxhzkxL3bKeba5h";

/// Data the suites are parametrized over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteParams {
    /// Block whose analytics tab is checked
    pub state_hash: String,
    /// Account page used as a spotlight origin
    pub account_pk: String,
    /// Fixed wait around spotlight clicks
    #[serde(with = "settle_ms")]
    pub settle: Option<Duration>,
}

impl Default for SuiteParams {
    fn default() -> Self {
        Self {
            state_hash: DEFAULT_STATE_HASH.to_string(),
            account_pk: DEFAULT_ACCOUNT_PK.to_string(),
            settle: None,
        }
    }
}

mod settle_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

/// Every explorer suite, in run order
#[must_use]
pub fn explorer_suites(params: &SuiteParams) -> Vec<TestSuite> {
    vec![
        block_analytic_tab(&params.state_hash),
        empty_table(),
        block_spotlight(params),
    ]
}
