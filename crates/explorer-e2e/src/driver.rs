//! PageDriver - abstract browser page seam
//!
//! Everything the harness does to a page goes through [`PageDriver`]:
//! navigate, read the URL, resolve a selector, click. Two implementations
//! ship with the crate:
//!
//! - `ChromiumDriver` (feature `browser`): a real Chromium tab over CDP
//! - [`MockDriver`]: a page of a scripted in-memory [`MockSite`], with
//!   per-route render delays so asynchronous rendering can be exercised
//!   without a browser
//!
//! A [`PageFactory`] hands out one fresh driver per test case.

use crate::locator::Selector;
use crate::result::{HarnessError, HarnessResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Snapshot of one resolved element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Lower-case tag name
    pub tag_name: String,
    /// Element text content
    pub text_content: String,
    /// Whether the element has a layout box
    pub visible: bool,
    /// `href` attribute, for links
    pub href: Option<String>,
}

impl ElementHandle {
    /// Create a new visible element handle
    #[must_use]
    pub fn new(tag_name: impl Into<String>, text_content: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            text_content: text_content.into(),
            visible: true,
            href: None,
        }
    }
}

/// Abstract page driver for browser automation
///
/// Implementations must resolve selectors against the live document on
/// every call; nothing may be cached between calls.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to an absolute URL
    async fn navigate(&mut self, url: &str) -> HarnessResult<()>;

    /// Get current URL
    async fn current_url(&self) -> HarnessResult<String>;

    /// Resolve every element matching `selector`, in document order
    async fn query_all(&self, selector: &Selector) -> HarnessResult<Vec<ElementHandle>>;

    /// Click match `index` of `selector`
    ///
    /// With `force`, the click is dispatched straight to the element
    /// without scrolling or hit-testing.
    async fn click(&mut self, selector: &Selector, index: usize, force: bool) -> HarnessResult<()>;

    /// Close the page
    async fn close(&mut self) -> HarnessResult<()>;
}

/// Produces a fresh, exclusive page for each test case
#[async_trait]
pub trait PageFactory: Send + Sync {
    /// Open a new page
    async fn new_page(&self) -> HarnessResult<Box<dyn PageDriver>>;
}

// ============================================================================
// Scripted in-memory site
// ============================================================================

/// One element on a scripted page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Selectors this element answers to (exact string match)
    pub selectors: Vec<String>,
    /// Tag name reported to the harness
    pub tag_name: String,
    /// Text content
    pub text: String,
    /// Link target; clicking navigates here
    pub href: Option<String>,
    /// Whether the element has a layout box
    pub visible: bool,
}

impl MockElement {
    /// An element answering to a single selector
    #[must_use]
    pub fn new(selector: impl Into<String>, text: impl Into<String>) -> Self {
        let selector = selector.into();
        Self {
            tag_name: selector
                .split(|c: char| !c.is_ascii_alphanumeric() && c != '-')
                .next()
                .unwrap_or_default()
                .to_string(),
            selectors: vec![selector],
            text: text.into(),
            href: None,
            visible: true,
        }
    }

    /// A link answering to each of `selectors`
    #[must_use]
    pub fn link<I, S>(selectors: I, href: impl Into<String>, text: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selectors: selectors.into_iter().map(Into::into).collect(),
            tag_name: "a".to_string(),
            text: text.into(),
            href: Some(href.into()),
            visible: true,
        }
    }

    /// Also answer to `selector`
    #[must_use]
    pub fn also(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    /// Mark the element hidden (no layout box)
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    fn matches(&self, selector: &Selector) -> bool {
        let answers = |css: &str| self.selectors.iter().any(|s| s == css);
        match selector {
            Selector::Css(css) => answers(css),
            Selector::TestId(_) => selector.as_css().is_some_and(|css| answers(&css)),
            Selector::Text(text) => self.text.contains(text.as_str()),
            Selector::CssWithText { css, text } => answers(css) && self.text.contains(text.as_str()),
        }
    }

    fn handle(&self) -> ElementHandle {
        ElementHandle {
            tag_name: self.tag_name.clone(),
            text_content: self.text.clone(),
            visible: self.visible,
            href: self.href.clone(),
        }
    }
}

/// A scripted route of a [`MockSite`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRoute {
    /// Path (with query) this route serves; a trailing `*` matches any suffix
    pub pattern: String,
    /// Elements rendered once `render_delay` has elapsed
    pub elements: Vec<MockElement>,
    /// Time between navigation and the elements appearing
    pub render_delay: Duration,
    /// When set, navigating here fails with this message
    pub failure: Option<String>,
}

impl MockRoute {
    /// A route that renders immediately
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            elements: Vec::new(),
            render_delay: Duration::ZERO,
            failure: None,
        }
    }

    /// A route whose navigation fails (server down, 5xx)
    #[must_use]
    pub fn failing(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(pattern)
        }
    }

    /// Add an element
    #[must_use]
    pub fn element(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Add `count` copies of an element
    #[must_use]
    pub fn repeat(mut self, count: usize, element: &MockElement) -> Self {
        self.elements
            .extend(std::iter::repeat_with(|| element.clone()).take(count));
        self
    }

    /// Delay rendering after navigation
    #[must_use]
    pub const fn render_after(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    fn serves(&self, path: &str) -> bool {
        self.pattern
            .strip_suffix('*')
            .map_or_else(|| self.pattern == path, |prefix| path.starts_with(prefix))
    }
}

/// A scripted site: routes keyed by path, shared by every page it opens
#[derive(Debug, Clone, Default)]
pub struct MockSite {
    routes: Arc<Vec<MockRoute>>,
    pages_opened: Arc<AtomicUsize>,
}

impl MockSite {
    /// Create an empty site
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route; earlier routes win when patterns overlap
    #[must_use]
    pub fn route(mut self, route: MockRoute) -> Self {
        Arc::make_mut(&mut self.routes).push(route);
        self
    }

    /// Open a page on this site
    #[must_use]
    pub fn open(&self) -> MockDriver {
        self.pages_opened.fetch_add(1, Ordering::SeqCst);
        MockDriver::new(self.clone())
    }

    /// Number of pages opened so far
    #[must_use]
    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    fn lookup(&self, path: &str) -> Option<&MockRoute> {
        self.routes.iter().find(|r| r.serves(path))
    }
}

#[async_trait]
impl PageFactory for MockSite {
    async fn new_page(&self) -> HarnessResult<Box<dyn PageDriver>> {
        Ok(Box::new(self.open()))
    }
}

/// Strip scheme and host, keeping path and query
fn path_of(url: &str) -> &str {
    url.split_once("://")
        .map_or(url, |(_, rest)| rest.find('/').map_or("/", |i| &rest[i..]))
}

/// Mock driver for unit testing: one page of a [`MockSite`]
#[derive(Debug)]
pub struct MockDriver {
    site: MockSite,
    /// Current URL
    pub current_url: String,
    loaded_at: Instant,
    closed: bool,
    /// Call history for verification
    pub call_history: Vec<String>,
}

impl MockDriver {
    /// Create a page on `site`, starting at `about:blank`
    #[must_use]
    pub fn new(site: MockSite) -> Self {
        Self {
            site,
            current_url: "about:blank".to_string(),
            loaded_at: Instant::now(),
            closed: false,
            call_history: Vec::new(),
        }
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }

    fn ensure_open(&self) -> HarnessResult<()> {
        if self.closed {
            Err(HarnessError::page("page is closed"))
        } else {
            Ok(())
        }
    }

    fn rendered(&self) -> Vec<&MockElement> {
        match self.site.lookup(path_of(&self.current_url)) {
            Some(route) if self.loaded_at.elapsed() >= route.render_delay => {
                route.elements.iter().collect()
            }
            _ => Vec::new(),
        }
    }

    fn origin(&self) -> String {
        let path = path_of(&self.current_url);
        self.current_url
            .strip_suffix(path)
            .unwrap_or(&self.current_url)
            .to_string()
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn navigate(&mut self, url: &str) -> HarnessResult<()> {
        self.ensure_open()?;
        self.call_history.push(format!("navigate:{url}"));
        if let Some(message) = self
            .site
            .lookup(path_of(url))
            .and_then(|r| r.failure.clone())
        {
            return Err(HarnessError::navigation(url, message));
        }
        self.current_url = url.to_string();
        self.loaded_at = Instant::now();
        Ok(())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        self.ensure_open()?;
        Ok(self.current_url.clone())
    }

    async fn query_all(&self, selector: &Selector) -> HarnessResult<Vec<ElementHandle>> {
        self.ensure_open()?;
        Ok(self
            .rendered()
            .into_iter()
            .filter(|e| e.matches(selector))
            .map(MockElement::handle)
            .collect())
    }

    async fn click(&mut self, selector: &Selector, index: usize, force: bool) -> HarnessResult<()> {
        self.ensure_open()?;
        self.call_history
            .push(format!("click:{selector}[{index}] force={force}"));
        let href = self
            .rendered()
            .into_iter()
            .filter(|e| e.matches(selector))
            .nth(index)
            .ok_or_else(|| HarnessError::page(format!("no element {selector} at index {index}")))?
            .href
            .clone();

        if let Some(href) = href {
            let target = if href.contains("://") {
                href
            } else {
                format!("{}{href}", self.origin())
            };
            self.current_url = target;
            self.loaded_at = Instant::now();
        }
        Ok(())
    }

    async fn close(&mut self) -> HarnessResult<()> {
        self.call_history.push("close".to_string());
        self.closed = true;
        Ok(())
    }
}
