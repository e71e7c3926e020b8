//! Headless browser fetcher for JavaScript-rendered publisher pages.
//!
//! Uses chromiumoxide (CDP). A fetcher owns at most one browser process;
//! callers render what they need and then call [`BrowserFetcher::close`].
//! Dropping the fetcher also kills the process.

mod config;
mod types;

pub use config::BrowserEngineConfig;
pub use types::RenderedPage;

#[cfg(feature = "browser")]
use std::path::PathBuf;
#[cfg(feature = "browser")]
use std::time::Duration;

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

use super::ScraperError;

#[cfg(feature = "browser")]
fn browser_error(e: impl std::fmt::Display) -> ScraperError {
    ScraperError::Browser(e.to_string())
}

/// Browser-based fetcher.
#[cfg(feature = "browser")]
pub struct BrowserFetcher {
    config: BrowserEngineConfig,
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    /// Create a new browser fetcher. No process is started until the first render.
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self {
            config,
            browser: None,
            handler: None,
        }
    }

    /// Find Chrome executable.
    fn find_chrome(&self) -> Result<PathBuf, ScraperError> {
        if let Some(ref path) = self.config.chrome_path {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(ScraperError::Browser(format!(
                "configured Chrome executable not found: {}",
                path.display()
            )));
        }

        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in [
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                debug!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(ScraperError::Browser(
            "Chrome/Chromium not found; install it or set CHROME_PATH".to_string(),
        ))
    }

    /// Launch the browser if not already running.
    async fn ensure_browser(&mut self) -> Result<(), ScraperError> {
        if self.browser.is_some() {
            return Ok(());
        }

        let chrome_path = self.find_chrome()?;
        info!("Launching browser (headless={})", self.config.headless);

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(Duration::from_secs(self.config.timeout));

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer")
            .arg("--incognito");

        if self.config.no_sandbox {
            builder = builder
                .arg("--no-sandbox")
                .arg("--disable-setuid-sandbox");
        }

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder.build().map_err(browser_error)?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_error)?;

        let task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        self.browser = Some(browser);
        self.handler = Some(task);
        Ok(())
    }

    /// Render a page and return its DOM.
    ///
    /// When `wait_for` is set, waits (bounded by the page timeout) for that
    /// selector to appear before serializing the DOM.
    pub async fn render(
        &mut self,
        url: &str,
        user_agent: &str,
        wait_for: Option<&str>,
    ) -> Result<RenderedPage, ScraperError> {
        self.ensure_browser().await?;
        let timeout = Duration::from_secs(self.config.timeout);

        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ScraperError::Browser("browser not running".to_string()))?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(browser_error)?;

        page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
            .await
            .map_err(browser_error)?;

        info!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| ScraperError::Browser(format!("invalid URL {}: {}", url, e)))?;
        page.execute(nav_params).await.map_err(browser_error)?;

        let wait_for_ready_script = r#"
            new Promise((resolve) => {
                if (document.readyState === 'complete') {
                    resolve(document.readyState);
                } else {
                    window.addEventListener('load', () => resolve(document.readyState));
                    setTimeout(() => resolve('timeout'), 20000);
                }
            })
        "#;

        match tokio::time::timeout(timeout, page.evaluate(wait_for_ready_script.to_string())).await
        {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state: {}", url),
        }

        if let Some(selector) = wait_for {
            debug!("Waiting for selector: {}", selector);
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                if page.find_element(selector).await.is_ok() {
                    break;
                }
                if tokio::time::Instant::now() >= deadline {
                    warn!("Timeout waiting for selector {} on {}", selector, url);
                    break;
                }
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        }

        let final_url = page
            .url()
            .await
            .map_err(browser_error)?
            .unwrap_or_else(|| url.to_string());
        let content = page.content().await.map_err(browser_error)?;

        let _ = page.close().await;

        Ok(RenderedPage {
            final_url,
            content,
        })
    }

    /// Shut the browser down and reap the process.
    pub async fn close(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                debug!("Browser close failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Browser wait failed: {}", e);
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

#[cfg(feature = "browser")]
impl Drop for BrowserFetcher {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct BrowserFetcher {
    #[allow(dead_code)]
    config: BrowserEngineConfig,
}

#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }

    pub async fn render(
        &mut self,
        _url: &str,
        _user_agent: &str,
        _wait_for: Option<&str>,
    ) -> Result<RenderedPage, ScraperError> {
        Err(ScraperError::Browser(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }

    pub async fn close(&mut self) {}
}
