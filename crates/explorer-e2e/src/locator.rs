//! Locators: references to zero-or-more elements on the live page.
//!
//! A locator is never resolved ahead of time. Every poll, click, and
//! observation re-queries the page, since the explorer re-renders tables
//! and links as data arrives.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::assertion::retry::DEFAULT_TIMEOUT_MS;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g. `a[href^="/blocks/"]`, or a component tag like `analytics-sm`)
    Css(String),
    /// Innermost elements whose text content includes the string
    Text(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// CSS selector narrowed to elements containing text
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Plain CSS equivalent, when one exists
    #[must_use]
    pub fn as_css(&self) -> Option<String> {
        match self {
            Self::Css(css) => Some(css.clone()),
            Self::TestId(id) => Some(format!("[data-testid={}]", js_string(id))),
            Self::Text(_) | Self::CssWithText { .. } => None,
        }
    }

    /// JavaScript expression evaluating to an array of the matching elements
    #[must_use]
    pub fn to_query_all(&self) -> String {
        match self {
            Self::Css(_) | Self::TestId(_) => {
                let css = self.as_css().unwrap_or_default();
                format!("Array.from(document.querySelectorAll({}))", js_string(&css))
            }
            Self::Text(text) => {
                let t = js_string(text);
                format!(
                    "Array.from(document.querySelectorAll('body, body *')).filter(el => \
                     el.textContent.includes({t}) && \
                     !Array.from(el.children).some(c => c.textContent.includes({t})))"
                )
            }
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => el.textContent.includes({}))",
                js_string(css),
                js_string(text)
            ),
        }
    }

    /// JavaScript expression describing every match as `{tag, text, visible, href}`
    #[must_use]
    pub fn to_describe_query(&self) -> String {
        format!(
            "{}.map(el => ({{ \
             tag_name: el.tagName.toLowerCase(), \
             text_content: el.textContent || '', \
             visible: !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length), \
             href: el.getAttribute('href') }}))",
            self.to_query_all()
        )
    }

    /// JavaScript expression clicking match `index` directly; evaluates to whether it existed
    #[must_use]
    pub fn to_click_script(&self, index: usize) -> String {
        format!(
            "(() => {{ const el = {}[{index}]; if (!el) return false; el.click(); return true; }})()",
            self.to_query_all()
        )
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(css) => write!(f, "{css}"),
            Self::Text(text) => write!(f, "text={text:?}"),
            Self::TestId(id) => write!(f, "[data-testid={id:?}]"),
            Self::CssWithText { css, text } => write!(f, "{css}:has-text({text:?})"),
        }
    }
}

/// Quote a Rust string as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// A locator: a selector plus an optional position filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    selector: Selector,
    index: Option<usize>,
}

impl Locator {
    /// Create a new locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Create a locator from a selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            index: None,
        }
    }

    /// Locate the innermost elements containing `text`
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Text(text.into()))
    }

    /// Locate by `data-testid`
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::TestId(id.into()))
    }

    /// Filter by text content
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let text = text.into();
        let selector = match self.selector {
            Selector::Css(css) | Selector::CssWithText { css, .. } => {
                Selector::CssWithText { css, text }
            }
            Selector::TestId(id) => Selector::CssWithText {
                css: format!("[data-testid={}]", js_string(&id)),
                text,
            },
            Selector::Text(_) => Selector::Text(text),
        };
        Self {
            selector,
            index: self.index,
        }
    }

    /// Narrow to the first match
    #[must_use]
    pub const fn first(self) -> Self {
        self.nth(0)
    }

    /// Narrow to the match at `index` (zero-based)
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the position filter
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    /// Apply the position filter to a resolved element list
    #[must_use]
    pub fn narrow<T>(&self, mut resolved: Vec<T>) -> Vec<T> {
        match self.index {
            None => resolved,
            Some(i) if i < resolved.len() => vec![resolved.swap_remove(i)],
            Some(_) => Vec::new(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)?;
        match self.index {
            Some(0) => write!(f, " >> first"),
            Some(i) => write!(f, " >> nth={i}"),
            None => Ok(()),
        }
    }
}

impl From<&str> for Locator {
    fn from(selector: &str) -> Self {
        Self::new(selector)
    }
}

/// Options for a click action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOptions {
    /// Skip visibility checks and click even if nothing resolves
    pub force: bool,
    /// How long to wait for the target to resolve
    pub timeout: Duration,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            force: false,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl ClickOptions {
    /// Default options: wait for a visible target, fail loudly otherwise
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forced click: dispatch on the first match without interactability checks
    #[must_use]
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    /// Set how long to wait for the target to resolve
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
