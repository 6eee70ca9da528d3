//! Retry assertions with polling.
//!
//! The explorer renders asynchronously: tables fill in after GraphQL
//! responses arrive and links appear after hydration. A single synchronous
//! check is flaky, so every assertion polls a check until it passes or the
//! [`RetryBudget`] runs out.
//!
//! Timing contract:
//! - a check that passes on the first attempt returns without sleeping;
//! - a check that never passes fails no later than
//!   `timeout + poll_interval` after the first attempt started.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::future::Future;
use std::time::{Duration, Instant};

/// Result of a single check inside a retry loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionCheckResult {
    /// Assertion passed
    Pass,
    /// Assertion failed; carries what was observed
    Fail(String),
}

impl AssertionCheckResult {
    /// Check if the result is a pass
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Check if the result is a fail
    #[must_use]
    pub const fn is_fail(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}

/// How long an assertion may keep polling, and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBudget {
    /// Total time allowed before the assertion fails
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    /// Pause between two checks
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,
}

/// Default assertion timeout (4 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 4000;

/// Default poll interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl RetryBudget {
    /// Create a budget with the given timeout and the default poll interval
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Create a budget from millisecond values
    #[must_use]
    pub const fn from_millis(timeout_ms: u64, poll_interval_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Short timeout, fast polling
    #[must_use]
    pub const fn fast() -> Self {
        Self::from_millis(500, 50)
    }

    /// Long timeout for slow pages (spotlight navigation, cold GraphQL caches)
    #[must_use]
    pub const fn slow() -> Self {
        Self::from_millis(10_000, 250)
    }

    /// Worst-case time an exhausted assertion can take
    #[must_use]
    pub fn worst_case(&self) -> Duration {
        self.timeout + self.poll_interval
    }
}

/// Failure message for a check cut off at the deadline
pub const CHECK_DID_NOT_COMPLETE: &str = "check did not complete";

/// A retry assertion that polls an async check until success or timeout
///
/// ## Example
///
/// ```ignore
/// let outcome = RetryAssertion::new(|| async {
///     if page_ready().await {
///         AssertionCheckResult::Pass
///     } else {
///         AssertionCheckResult::Fail("still loading".into())
///     }
/// })
/// .with_budget(RetryBudget::slow())
/// .verify()
/// .await?;
/// ```
pub struct RetryAssertion<F> {
    check: F,
    budget: RetryBudget,
    description: Option<String>,
}

impl<F, Fut> RetryAssertion<F>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AssertionCheckResult>,
{
    /// Create a new retry assertion with the default budget
    #[must_use]
    pub fn new(check: F) -> Self {
        Self {
            check,
            budget: RetryBudget::default(),
            description: None,
        }
    }

    /// Set the whole budget
    #[must_use]
    pub const fn with_budget(mut self, budget: RetryBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Set the timeout duration
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.budget.timeout = timeout;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.budget.poll_interval = interval;
        self
    }

    /// Set a description for the assertion
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Get the current budget
    #[must_use]
    pub const fn budget(&self) -> &RetryBudget {
        &self.budget
    }

    /// Verify the assertion, retrying until success or timeout
    ///
    /// # Errors
    ///
    /// Returns error if the check still fails once the budget is spent
    pub async fn verify(mut self) -> Result<RetryOutcome, RetryError> {
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;

            // a check may not outlive the worst-case deadline
            let limit = self.budget.worst_case().saturating_sub(start.elapsed());
            let result = tokio::time::timeout(limit, (self.check)())
                .await
                .unwrap_or_else(|_| AssertionCheckResult::Fail(CHECK_DID_NOT_COMPLETE.into()));

            let message = match result {
                AssertionCheckResult::Pass => {
                    return Ok(RetryOutcome {
                        attempts,
                        duration: start.elapsed(),
                    });
                }
                AssertionCheckResult::Fail(msg) => msg,
            };

            let elapsed = start.elapsed();
            if elapsed >= self.budget.timeout {
                return Err(RetryError {
                    message,
                    attempts,
                    duration: elapsed,
                    description: self.description,
                });
            }

            // never sleep past the deadline; the last check lands on it
            let remaining = self.budget.timeout - elapsed;
            let pause = self.budget.poll_interval.min(remaining);
            tracing::trace!(attempts, ?pause, last = %message, "retrying assertion");
            tokio::time::sleep(pause).await;
        }
    }

    /// Verify the assertion once without retrying
    ///
    /// # Errors
    ///
    /// Returns error if the check fails
    pub async fn verify_once(mut self) -> Result<(), RetryError> {
        let start = Instant::now();
        match (self.check)().await {
            AssertionCheckResult::Pass => Ok(()),
            AssertionCheckResult::Fail(message) => Err(RetryError {
                message,
                attempts: 1,
                duration: start.elapsed(),
                description: self.description,
            }),
        }
    }
}

impl<F> Debug for RetryAssertion<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryAssertion")
            .field("budget", &self.budget)
            .field("description", &self.description)
            .finish()
    }
}

/// Poll `check` under `budget`; shorthand for [`RetryAssertion::verify`]
///
/// # Errors
///
/// Returns error if the check never passes within the budget
pub async fn poll_until<F, Fut>(budget: RetryBudget, check: F) -> Result<RetryOutcome, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AssertionCheckResult>,
{
    RetryAssertion::new(check).with_budget(budget).verify().await
}

/// Result of a successful retry assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOutcome {
    /// Number of attempts before success
    pub attempts: usize,
    /// Total duration of all attempts
    pub duration: Duration,
}

/// Error when retry assertion fails
#[derive(Debug, Clone)]
pub struct RetryError {
    /// Last failure message
    pub message: String,
    /// Number of attempts made
    pub attempts: usize,
    /// Total duration of all attempts
    pub duration: Duration,
    /// Description of the assertion
    pub description: Option<String>,
}

impl std::fmt::Display for RetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref desc) = self.description {
            write!(f, "{desc}: ")?;
        }
        write!(
            f,
            "assertion failed after {} attempt(s) ({:.2}s): {}",
            self.attempts,
            self.duration.as_secs_f64(),
            self.message
        )
    }
}

impl std::error::Error for RetryError {}

/// Serde helper storing a `Duration` as whole milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
