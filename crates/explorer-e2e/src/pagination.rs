//! Listing-page records footer.
//!
//! Every explorer listing renders `Showing {from} to {to} of {total} records`
//! under its table. An empty result renders `Showing 0 to 0 of 0 records`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// The footer under a paginated listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordsFooter {
    /// One-based index of the first record shown, 0 when empty
    pub from: u64,
    /// One-based index of the last record shown
    pub to: u64,
    /// Total matching records
    pub total: u64,
}

impl RecordsFooter {
    /// Footer of a listing with no results
    pub const EMPTY: Self = Self {
        from: 0,
        to: 0,
        total: 0,
    };

    /// Footer for `page` (one-based) of `total` records, `per_page` at a time
    ///
    /// A page past the end shows an empty range positioned after the last
    /// record.
    #[must_use]
    pub fn for_page(total: u64, per_page: u64, page: u64) -> Self {
        if total == 0 || per_page == 0 {
            return Self {
                total,
                ..Self::EMPTY
            };
        }
        let start = per_page.saturating_mul(page.saturating_sub(1)).min(total);
        let end = start.saturating_add(per_page).min(total);
        Self {
            from: if end > start { start + 1 } else { start },
            to: end,
            total,
        }
    }

    /// Parse the footer out of page text
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let caps = footer_pattern().captures(text)?;
        let field = |i: usize| -> Option<u64> { caps.get(i)?.as_str().replace(',', "").parse().ok() };
        Some(Self {
            from: field(1)?,
            to: field(2)?,
            total: field(3)?,
        })
    }

    /// Whether the listing shows no records
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl fmt::Display for RecordsFooter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Showing {} to {} of {} records",
            self.from, self.to, self.total
        )
    }
}

fn footer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"Showing\s+([\d,]+)\s+to\s+([\d,]+)\s+of\s+([\d,]+)\s+records").unwrap()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_renders_zero_records() {
        assert_eq!(
            RecordsFooter::EMPTY.to_string(),
            "Showing 0 to 0 of 0 records"
        );
        assert!(RecordsFooter::EMPTY.is_empty());
    }

    #[test]
    fn test_for_page() {
        assert_eq!(RecordsFooter::for_page(0, 25, 1), RecordsFooter::EMPTY);
        assert_eq!(
            RecordsFooter::for_page(57, 25, 1).to_string(),
            "Showing 1 to 25 of 57 records"
        );
        assert_eq!(
            RecordsFooter::for_page(57, 25, 3).to_string(),
            "Showing 51 to 57 of 57 records"
        );
    }

    #[test]
    fn test_page_past_end() {
        let footer = RecordsFooter::for_page(10, 25, 4);
        assert_eq!(footer.from, 10);
        assert_eq!(footer.to, 10);
    }

    #[test]
    fn test_parse_embedded_text() {
        let footer = RecordsFooter::parse("Blocks\n  Showing 1 to 10 of 1,234 records  Next")
            .unwrap();
        assert_eq!(
            footer,
            RecordsFooter {
                from: 1,
                to: 10,
                total: 1234
            }
        );
        assert!(RecordsFooter::parse("No results").is_none());
    }

    proptest! {
        #[test]
        fn prop_footer_range_is_consistent(total in 0u64..100_000, per_page in 1u64..500, page in 1u64..1000) {
            let footer = RecordsFooter::for_page(total, per_page, page);
            prop_assert!(footer.from <= footer.to);
            prop_assert!(footer.to <= footer.total);
            prop_assert!(footer.to - footer.from < per_page);
            prop_assert_eq!(RecordsFooter::parse(&footer.to_string()), Some(footer));
        }

        #[test]
        fn prop_empty_total_is_the_zero_footer(per_page in 1u64..500, page in 1u64..1000) {
            prop_assert_eq!(RecordsFooter::for_page(0, per_page, page), RecordsFooter::EMPTY);
        }
    }
}
