//! Browser control for headless testing.
//!
//! With the `browser` feature, [`ChromiumFactory`] launches Chromium over
//! the Chrome `DevTools` Protocol (chromiumoxide) and hands out one
//! [`ChromiumDriver`] tab per test case. Without the feature only
//! [`BrowserConfig`] is available.

use serde::{Deserialize, Serialize};

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Extra command-line switches
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
            args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Add a command-line switch
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Log how the browser process ended; returns whether it exited cleanly
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn log_shutdown(waited: &std::io::Result<Option<std::process::ExitStatus>>) -> bool {
    match waited {
        Ok(Some(status)) if status.success() => {
            tracing::debug!(%status, "browser exited");
            true
        }
        Ok(Some(status)) => {
            tracing::debug!(%status, "browser exited with failure status");
            false
        }
        Ok(None) => {
            tracing::debug!("browser process already reaped");
            true
        }
        Err(e) => {
            tracing::debug!(error = %e, "waiting for browser exit failed");
            false
        }
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::BrowserConfig;
    use crate::driver::{ElementHandle, PageDriver, PageFactory};
    use crate::locator::Selector;
    use crate::result::{HarnessError, HarnessResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn page_error(e: impl std::fmt::Display) -> HarnessError {
        HarnessError::page(e.to_string())
    }

    /// A launched Chromium process; opens one tab per test case
    #[derive(Debug)]
    pub struct ChromiumFactory {
        config: BrowserConfig,
        inner: Arc<Mutex<CdpBrowser>>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl ChromiumFactory {
        /// Launch a new browser instance
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be launched
        pub async fn launch(config: BrowserConfig) -> HarnessResult<Self> {
            let mut builder =
                CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            for arg in &config.args {
                builder = builder.arg(arg.as_str());
            }

            let cdp_config = builder.build().map_err(HarnessError::browser_launch)?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| HarnessError::browser_launch(e.to_string()))?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        tracing::debug!(error = %e, "cdp handler stopped");
                        break;
                    }
                }
            });

            tracing::info!(headless = config.headless, "browser launched");
            Ok(Self {
                config,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser
        ///
        /// # Errors
        ///
        /// Returns error if the browser does not shut down cleanly
        pub async fn close(self) -> HarnessResult<()> {
            let mut browser = self.inner.lock().await;
            browser
                .close()
                .await
                .map_err(|e| HarnessError::browser_launch(e.to_string()))?;
            super::log_shutdown(&browser.wait().await);
            self.handle.abort();
            Ok(())
        }
    }

    #[async_trait]
    impl PageFactory for ChromiumFactory {
        async fn new_page(&self) -> HarnessResult<Box<dyn PageDriver>> {
            let browser = self.inner.lock().await;
            let page = browser.new_page("about:blank").await.map_err(page_error)?;
            Ok(Box::new(ChromiumDriver { page: Some(page) }))
        }
    }

    /// One Chromium tab
    #[derive(Debug)]
    pub struct ChromiumDriver {
        page: Option<CdpPage>,
    }

    impl ChromiumDriver {
        fn page(&self) -> HarnessResult<&CdpPage> {
            self.page
                .as_ref()
                .ok_or_else(|| HarnessError::page("page is closed"))
        }
    }

    #[async_trait]
    impl PageDriver for ChromiumDriver {
        async fn navigate(&mut self, url: &str) -> HarnessResult<()> {
            self.page()?
                .goto(url)
                .await
                .map_err(|e| HarnessError::navigation(url, e.to_string()))?;
            Ok(())
        }

        async fn current_url(&self) -> HarnessResult<String> {
            Ok(self
                .page()?
                .url()
                .await
                .map_err(page_error)?
                .unwrap_or_else(|| "about:blank".to_string()))
        }

        async fn query_all(&self, selector: &Selector) -> HarnessResult<Vec<ElementHandle>> {
            self.page()?
                .evaluate(selector.to_describe_query())
                .await
                .map_err(page_error)?
                .into_value::<Vec<ElementHandle>>()
                .map_err(HarnessError::from)
        }

        async fn click(&mut self, selector: &Selector, index: usize, force: bool) -> HarnessResult<()> {
            let page = self.page()?;
            if let Some(css) = selector.as_css().filter(|_| !force) {
                // real mouse events: scrolls into view, hits whatever is on top
                let elements = page.find_elements(css).await.map_err(page_error)?;
                let element = elements
                    .get(index)
                    .ok_or_else(|| HarnessError::page(format!("no element {selector} at index {index}")))?;
                element.click().await.map_err(page_error)?;
                return Ok(());
            }

            let clicked: bool = page
                .evaluate(selector.to_click_script(index))
                .await
                .map_err(page_error)?
                .into_value()?;
            if clicked {
                Ok(())
            } else {
                Err(HarnessError::page(format!(
                    "no element {selector} at index {index}"
                )))
            }
        }

        async fn close(&mut self) -> HarnessResult<()> {
            match self.page.take() {
                Some(page) => page.close().await.map_err(page_error),
                None => Ok(()),
            }
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{ChromiumDriver, ChromiumFactory};
