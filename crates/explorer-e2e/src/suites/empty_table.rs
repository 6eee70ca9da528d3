//! Listing pages with a query that matches nothing.

use super::CI_TAG;
use crate::harness::{define_suite, TestSuite};
use crate::pagination::RecordsFooter;

/// Listing paths whose filter matches no records
pub const EMPTY_RESULT_PATHS: [&str; 6] = [
    "/blocks?q-state-hash=3Nfake",
    "/commands/user-commands?query=fake",
    "/commands/internal-commands?q-recipient=B62qfake",
    "/snarks?q-state-hash=3Nfake",
    "/staking-ledgers?query=fake",
    "/next-stakes?query=fake",
];

/// `empty table`: each listing shows the zero-records footer
#[must_use]
pub fn empty_table() -> TestSuite {
    define_suite([CI_TAG], "empty table", |suite| {
        suite.parametrized(
            EMPTY_RESULT_PATHS,
            |path| format!("on {path} shows as having zero records"),
            |ctx, path| {
                Box::pin(async move {
                    ctx.visit(path).await?;
                    ctx.contains(&RecordsFooter::EMPTY.to_string()).await?;
                    Ok(())
                })
            },
        )
    })
}
