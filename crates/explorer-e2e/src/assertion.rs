//! Expectations checked against live page state.
//!
//! An [`Expectation`] is a pure predicate over an [`Observation`]; the page
//! context takes a fresh observation on every poll and hands it here.

pub mod retry;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use retry::{
    poll_until, AssertionCheckResult, RetryAssertion, RetryBudget, RetryError, RetryOutcome,
};

/// Longest text fragment echoed back in diagnostics
const MAX_ECHO_CHARS: usize = 80;

/// What the page looked like at one poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Observation {
    /// Elements resolved by a locator (possibly none)
    Elements {
        /// Text content of every resolved element, in document order
        texts: Vec<String>,
    },
    /// The page's current URL
    Url(String),
    /// The page could not be queried (e.g. mid-navigation)
    Unavailable(String),
}

impl Observation {
    /// Build an element observation
    #[must_use]
    pub fn elements<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Elements {
            texts: texts.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of resolved elements (zero for non-element observations)
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Elements { texts } => texts.len(),
            Self::Url(_) | Self::Unavailable(_) => 0,
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elements { texts } if texts.is_empty() => write!(f, "0 elements"),
            Self::Elements { texts } => {
                write!(f, "{} element(s): [", texts.len())?;
                for (i, text) in texts.iter().take(3).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", echo(text))?;
                }
                if texts.len() > 3 {
                    write!(f, ", …")?;
                }
                write!(f, "]")
            }
            Self::Url(url) => write!(f, "url {url:?}"),
            Self::Unavailable(reason) => write!(f, "page unavailable ({reason})"),
        }
    }
}

fn echo(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_ECHO_CHARS {
        let head: String = collapsed.chars().take(MAX_ECHO_CHARS).collect();
        format!("{head}…")
    } else {
        collapsed
    }
}

/// A pure predicate over an [`Observation`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expectation {
    /// Exactly `n` elements resolve
    HasLength(usize),
    /// At least one element resolves
    NotEmpty,
    /// Some resolved element's text contains the needle
    ContainsText(String),
    /// Some resolved element's trimmed text equals the value
    TextEquals(String),
    /// The current URL contains the substring
    UrlIncludes(String),
    /// The current URL equals the value
    UrlEquals(String),
}

impl Expectation {
    /// Expect exactly `n` elements
    #[must_use]
    pub const fn length(n: usize) -> Self {
        Self::HasLength(n)
    }

    /// Expect some element to contain `text`
    #[must_use]
    pub fn contains(text: impl Into<String>) -> Self {
        Self::ContainsText(text.into())
    }

    /// Expect the URL to include `fragment`
    #[must_use]
    pub fn url_includes(fragment: impl Into<String>) -> Self {
        Self::UrlIncludes(fragment.into())
    }

    /// Whether this expectation is about the URL rather than elements
    #[must_use]
    pub const fn is_url(&self) -> bool {
        matches!(self, Self::UrlIncludes(_) | Self::UrlEquals(_))
    }

    /// Evaluate against an observation
    #[must_use]
    pub fn check(&self, observed: &Observation) -> AssertionCheckResult {
        let passed = match (self, observed) {
            (_, Observation::Unavailable(_)) => false,
            (Self::HasLength(n), Observation::Elements { texts }) => texts.len() == *n,
            (Self::NotEmpty, Observation::Elements { texts }) => !texts.is_empty(),
            (Self::ContainsText(needle), Observation::Elements { texts }) => {
                texts.iter().any(|t| t.contains(needle.as_str()))
            }
            (Self::TextEquals(value), Observation::Elements { texts }) => {
                texts.iter().any(|t| t.trim() == value)
            }
            (Self::UrlIncludes(fragment), Observation::Url(url)) => url.contains(fragment.as_str()),
            (Self::UrlEquals(value), Observation::Url(url)) => url == value,
            (expectation, other) => {
                return AssertionCheckResult::Fail(format!(
                    "cannot check '{expectation}' against {other}"
                ));
            }
        };

        if passed {
            AssertionCheckResult::Pass
        } else {
            AssertionCheckResult::Fail(observed.to_string())
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HasLength(n) => write!(f, "have length {n}"),
            Self::NotEmpty => write!(f, "exist"),
            Self::ContainsText(t) => write!(f, "contain {t:?}"),
            Self::TextEquals(t) => write!(f, "have text {t:?}"),
            Self::UrlIncludes(s) => write!(f, "include {s:?}"),
            Self::UrlEquals(s) => write!(f, "equal {s:?}"),
        }
    }
}
