//! Browser control for end-to-end runs.
//!
//! Real browser control goes through the Chrome `DevTools` Protocol. When
//! compiled with the `browser` feature, chromiumoxide launches Chromium and
//! [`CdpPage`] implements [`PageDriver`](crate::driver::PageDriver) on top of
//! the locator scripts. Without the feature, launching fails with a
//! `BrowserLaunch` error and only the in-memory driver is available.

use serde::{Deserialize, Serialize};

use crate::result::{ProbeError, ProbeResult};

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// User agent string
    pub user_agent: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            user_agent: None,
            sandbox: true,
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

    /// Set user agent
    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::{BrowserConfig, ProbeError, ProbeResult};
    use crate::driver::{ElementSnapshot, PageDriver};
    use crate::locator::Locator;
    use crate::wait::{poll_until, Check, LoadState, WaitOptions, WaitOutcome};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
    use chromiumoxide::page::{Page as RawPage, ScreenshotParams};
    use futures::StreamExt;
    use std::time::{Duration, Instant};

    /// Browser instance with a live CDP connection
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        inner: CdpBrowser,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Browser {
        /// Launch Chromium and start the CDP handler task
        ///
        /// # Errors
        ///
        /// Returns `BrowserLaunch` if Chromium cannot be started
        pub async fn launch(config: BrowserConfig) -> ProbeResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            if let Some(ref ua) = config.user_agent {
                builder = builder.arg(format!("--user-agent={ua}"));
            }

            let cdp_config = builder
                .build()
                .map_err(|message| ProbeError::BrowserLaunch { message })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| ProbeError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        tracing::debug!(error = %e, "CDP handler stopped");
                        break;
                    }
                }
            });

            tracing::info!(headless = config.headless, "browser launched");
            Ok(Self {
                config,
                inner: browser,
                handle,
            })
        }

        /// Open a new blank tab
        ///
        /// # Errors
        ///
        /// Returns `BrowserLaunch` if the tab cannot be created
        pub async fn new_page(&self) -> ProbeResult<CdpPage> {
            let page = self
                .inner
                .new_page("about:blank")
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: format!("cannot open tab: {e}"),
                })?;
            Ok(CdpPage { inner: page })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser and stop the handler task
        ///
        /// # Errors
        ///
        /// Returns `BrowserLaunch` if Chromium does not shut down cleanly
        pub async fn close(mut self) -> ProbeResult<()> {
            let closed = self.inner.close().await;
            self.handle.abort();
            closed.map_err(|e| ProbeError::BrowserLaunch {
                message: format!("close failed: {e}"),
            })?;
            Ok(())
        }
    }

    /// One Chromium tab
    #[derive(Debug)]
    pub struct CdpPage {
        inner: RawPage,
    }

    impl CdpPage {
        async fn eval_string(&self, script: String, what: &str) -> ProbeResult<String> {
            let result = self
                .inner
                .evaluate(script)
                .await
                .map_err(|e| ProbeError::invalid_state(format!("{what}: {e}")))?;
            result
                .into_value::<String>()
                .map_err(|e| ProbeError::invalid_state(format!("{what}: {e}")))
        }

        fn check_action(locator: &Locator, outcome: String) -> ProbeResult<()> {
            if outcome == "ok" {
                Ok(())
            } else {
                Err(ProbeError::Interaction {
                    locator: locator.to_string(),
                    message: outcome,
                })
            }
        }
    }

    #[async_trait]
    impl PageDriver for CdpPage {
        async fn goto(
            &mut self,
            url: &str,
            wait_until: LoadState,
            timeout: Duration,
        ) -> ProbeResult<()> {
            let start = Instant::now();
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            let timed_out = || ProbeError::Timeout {
                what: format!("{wait_until} on {url}"),
                ms: timeout_ms,
            };

            match tokio::time::timeout(timeout, self.inner.goto(url)).await {
                Err(_) => return Err(timed_out()),
                Ok(Err(e)) => {
                    return Err(ProbeError::Navigation {
                        url: url.to_string(),
                        message: e.to_string(),
                    })
                }
                Ok(Ok(_)) => {}
            }

            let landed = self.current_url().await?;
            if landed.starts_with("chrome-error://") {
                return Err(ProbeError::Navigation {
                    url: url.to_string(),
                    message: "target unreachable".to_string(),
                });
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            let options = WaitOptions::new()
                .with_timeout(u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX))
                .with_wait_until(wait_until);
            let page: &Self = self;
            let outcome = poll_until(&options, move || async move {
                let state = page.ready_state().await?;
                Ok(if wait_until.is_reached_by(&state) {
                    Check::Ready(())
                } else {
                    Check::Pending(format!("readyState {state}"))
                })
            })
            .await?;
            match outcome {
                WaitOutcome::Satisfied { .. } => Ok(()),
                WaitOutcome::TimedOut { .. } => Err(timed_out()),
            }
        }

        async fn current_url(&self) -> ProbeResult<String> {
            self.inner
                .url()
                .await
                .map(Option::unwrap_or_default)
                .map_err(|e| ProbeError::invalid_state(format!("read url: {e}")))
        }

        async fn ready_state(&self) -> ProbeResult<String> {
            self.eval_string("document.readyState".to_string(), "read readyState")
                .await
        }

        async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementSnapshot>> {
            let json = self
                .eval_string(locator.to_query_script()?, "query")
                .await?;
            Ok(serde_json::from_str(&json)?)
        }

        async fn fill(&mut self, locator: &Locator, index: usize, value: &str) -> ProbeResult<()> {
            let outcome = self
                .eval_string(locator.to_fill_script(index, value)?, "fill")
                .await?;
            Self::check_action(locator, outcome)
        }

        async fn click(&mut self, locator: &Locator, index: usize) -> ProbeResult<()> {
            let outcome = self
                .eval_string(locator.to_click_script(index)?, "click")
                .await?;
            Self::check_action(locator, outcome)
        }

        async fn screenshot(&mut self) -> ProbeResult<Vec<u8>> {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build();
            self.inner
                .screenshot(params)
                .await
                .map_err(|e| ProbeError::Screenshot {
                    message: e.to_string(),
                })
        }
    }
}

// ============================================================================
// Without the `browser` feature
// ============================================================================

#[cfg(not(feature = "browser"))]
mod unavailable {
    use super::{BrowserConfig, ProbeError, ProbeResult};

    /// Placeholder browser that cannot be launched
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
    }

    impl Browser {
        /// Always fails: this build has no CDP support
        ///
        /// # Errors
        ///
        /// Always returns `BrowserLaunch`
        #[allow(clippy::unused_async)]
        pub async fn launch(config: BrowserConfig) -> ProbeResult<Self> {
            let _ = config;
            Err(ProbeError::BrowserLaunch {
                message: "built without the `browser` feature; rebuild with --features browser"
                    .to_string(),
            })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, CdpPage};

#[cfg(not(feature = "browser"))]
pub use unavailable::Browser;

#[cfg(test)]
mod tests {
    use super::*;

    mod config_tests {
        use super::*;

        #[test]
        fn test_default_is_headless_with_sandbox() {
            let config = BrowserConfig::default();
            assert!(config.headless);
            assert!(config.sandbox);
            assert!(config.chromium_path.is_none());
        }

        #[test]
        fn test_builders() {
            let config = BrowserConfig::default()
                .with_viewport(1920, 1080)
                .with_headless(false)
                .with_chromium_path("/usr/bin/chromium")
                .with_user_agent("dashprobe")
                .with_no_sandbox();
            assert_eq!(config.viewport_width, 1920);
            assert_eq!(config.viewport_height, 1080);
            assert!(!config.headless);
            assert!(!config.sandbox);
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
            assert_eq!(config.user_agent.as_deref(), Some("dashprobe"));
        }
    }

    #[cfg(not(feature = "browser"))]
    mod unavailable_tests {
        use super::*;
        use crate::result::ErrorKind;

        #[tokio::test]
        async fn test_launch_without_feature_fails() {
            let err = Browser::launch(BrowserConfig::default()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BrowserLaunchError);
        }
    }
}
