//! Result and error types for the harness.

use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while defining or running suites
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page error (driver or CDP failure outside navigation)
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// The target application failed to load
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// A URL could not be built from the base URL and path
    #[error("Invalid URL {url:?}: {message}")]
    InvalidUrl {
        /// Offending URL or path
        url: String,
        /// Error message
        message: String,
    },

    /// Predicate never became true within the retry budget
    #[error(
        "Timed out after {elapsed_ms}ms ({attempts} attempt(s)) waiting for {locator} to {predicate}; last observed: {last_observed}"
    )]
    AssertionTimeout {
        /// Locator (or `url`) the assertion resolved
        locator: String,
        /// Predicate description
        predicate: String,
        /// Last value seen before giving up
        last_observed: String,
        /// Number of polls performed
        attempts: usize,
        /// Wall-clock time spent polling
        elapsed_ms: u64,
    },

    /// A non-forced click resolved zero elements
    #[error("No element matches {locator} (waited {waited_ms}ms)")]
    ElementNotFound {
        /// Locator that resolved nothing
        locator: String,
        /// Time spent waiting for a match
        waited_ms: u64,
    },

    /// A non-forced click matched only hidden elements
    #[error("Element {locator} is not interactable (waited {waited_ms}ms)")]
    ElementNotInteractable {
        /// Locator of the hidden element
        locator: String,
        /// Time spent waiting for visibility
        waited_ms: u64,
    },

    /// A whole test case exceeded its time limit
    #[error("Test case timed out after {ms}ms")]
    CaseTimeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// The case body panicked
    #[error("panicked: {message}")]
    CasePanicked {
        /// Panic payload, when it was a string
        message: String,
    },

    /// Two cases in one suite share a description
    #[error("Suite {suite:?} defines {description:?} more than once")]
    DuplicateCase {
        /// Suite name
        suite: String,
        /// Repeated description
        description: String,
    },

    /// Two suites in one run share a name
    #[error("Suite name {name:?} is used more than once")]
    DuplicateSuite {
        /// Repeated suite name
        name: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create a navigation error
    #[must_use]
    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a browser launch error
    #[must_use]
    pub fn browser_launch(message: impl Into<String>) -> Self {
        Self::BrowserLaunch {
            message: message.into(),
        }
    }

    /// Create a panic error from a caught panic payload
    #[must_use]
    pub fn case_panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::CasePanicked { message }
    }

    /// Whether this error is a failed expectation rather than an infrastructure fault
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::AssertionTimeout { .. }
                | Self::ElementNotFound { .. }
                | Self::ElementNotInteractable { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_timeout_display_carries_diagnostics() {
        let err = HarnessError::AssertionTimeout {
            locator: "analytics-sm".into(),
            predicate: "have length 4".into(),
            last_observed: "2 element(s)".into(),
            attempts: 41,
            elapsed_ms: 4003,
        };
        let text = err.to_string();
        assert!(text.contains("analytics-sm"));
        assert!(text.contains("have length 4"));
        assert!(text.contains("2 element(s)"));
        assert!(text.contains("41 attempt(s)"));
    }

    #[test]
    fn test_element_not_found_display() {
        let err = HarnessError::ElementNotFound {
            locator: "a.missing".into(),
            waited_ms: 10_000,
        };
        assert!(err.to_string().contains("a.missing"));
        assert!(err.to_string().contains("10000ms"));
    }

    #[test]
    fn test_navigation_helper() {
        let err = HarnessError::navigation("http://localhost/blocks", "connection refused");
        assert!(err.to_string().contains("http://localhost/blocks"));
        assert!(!err.is_assertion());
    }

    #[test]
    fn test_is_assertion() {
        assert!(HarnessError::ElementNotFound {
            locator: "x".into(),
            waited_ms: 0
        }
        .is_assertion());
        assert!(!HarnessError::page("closed").is_assertion());
        assert!(!HarnessError::CaseTimeout { ms: 1 }.is_assertion());
    }

    #[test]
    fn test_case_panicked_payloads() {
        let err = HarnessError::case_panicked(&"index out of bounds");
        assert_eq!(err.to_string(), "panicked: index out of bounds");
        let err = HarnessError::case_panicked(&String::from("owned"));
        assert_eq!(err.to_string(), "panicked: owned");
        let err = HarnessError::case_panicked(&42_u32);
        assert!(err.to_string().contains("non-string"));
    }

    #[test]
    fn test_io_error_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: HarnessError = io.into();
        assert!(err.to_string().contains("I/O"));
    }
}
