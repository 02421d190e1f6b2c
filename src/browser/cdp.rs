//! Chrome session over CDP using chromiumoxide.
//!
//! The research extension lives in a real user profile, so the session
//! either attaches to an already-running Chrome exposing a remote-debugging
//! port, or launches one headful with that profile. Either way the rest of
//! the crate only sees the `BrowserSession`/`PageDriver` traits.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;

use super::{BrowserSession, PageDriver};
use crate::config::Config;

/// Find the Chrome binary path: explicit config, then system PATH.
pub fn find_chrome(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        if p.exists() {
            return Some(p.clone());
        }
    }
    for name in ["google-chrome", "chromium", "chromium-browser", "chrome"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }
    None
}

/// The shared Chrome automation session.
pub struct CdpSession {
    browser: Browser,
}

impl CdpSession {
    /// Attach to a running Chrome via its remote-debugging port, or launch
    /// a new headful instance with the configured profile when no port is
    /// configured or nothing answers on it.
    pub async fn acquire(cfg: &Config) -> Result<Self> {
        if let Some(port) = cfg.cdp_port {
            match Self::connect(port).await {
                Ok(session) => {
                    tracing::info!(port, "attached to running Chrome over CDP");
                    return Ok(session);
                }
                Err(e) => {
                    tracing::warn!(port, error = %e, "CDP attach failed, launching Chrome instead");
                }
            }
        }
        Self::launch(cfg).await
    }

    /// Connect to an existing Chrome. The websocket endpoint is discovered
    /// through the debug HTTP endpoint.
    pub async fn connect(port: u16) -> Result<Self> {
        let version_url = format!("http://127.0.0.1:{port}/json/version");
        let meta: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("CDP version endpoint unreachable")?
            .json()
            .await
            .context("CDP version endpoint returned malformed JSON")?;
        let ws_url = meta
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .context("CDP version response missing webSocketDebuggerUrl")?;

        let (browser, mut handler) = Browser::connect(ws_url)
            .await
            .context("failed to connect to Chrome over CDP")?;
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });
        Ok(Self { browser })
    }

    /// Launch a headful Chrome carrying the extension profile.
    pub async fn launch(cfg: &Config) -> Result<Self> {
        let chrome_path = find_chrome(cfg.chrome_path.as_ref())
            .context("Chrome not found; set CHROME_PATH or install google-chrome")?;

        let user_data_dir = cfg.user_data_dir.clone().or_else(|| {
            dirs::home_dir().map(|home| home.join(".marketscribe/chrome-profile"))
        });

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .with_head()
            .arg(format!("--profile-directory={}", cfg.profile_dir))
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if let Some(dir) = user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chrome")?;
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        tracing::info!("launched Chrome with extension profile");
        Ok(Self { browser })
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn pages(&self) -> Result<Vec<Box<dyn PageDriver>>> {
        let pages = self.browser.pages().await.context("failed to list pages")?;
        Ok(pages
            .into_iter()
            .map(|page| Box::new(CdpPage { page }) as Box<dyn PageDriver>)
            .collect())
    }

    async fn open_page(&self, url: &str) -> Result<Box<dyn PageDriver>> {
        let page = self
            .browser
            .new_page(url)
            .await
            .context("failed to open new page")?;
        Ok(Box::new(CdpPage { page }))
    }

    async fn close_pages_except(&self, keep: Option<&str>) -> Result<usize> {
        let mut closed = 0;
        for page in self.browser.pages().await.context("failed to list pages")? {
            let id = page.target_id().as_ref().to_string();
            if Some(id.as_str()) == keep {
                continue;
            }
            if page.close().await.is_ok() {
                closed += 1;
            }
        }
        Ok(closed)
    }
}

/// A single Chrome tab.
pub struct CdpPage {
    page: Page,
}

#[async_trait]
impl PageDriver for CdpPage {
    fn id(&self) -> String {
        self.page.target_id().as_ref().to_string()
    }

    async fn url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn bring_to_front(&self) -> Result<()> {
        self.page
            .bring_to_front()
            .await
            .context("failed to focus page")?;
        Ok(())
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let result = tokio::time::timeout(timeout, self.page.goto(url)).await;
        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;
                Ok(())
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {}ms", timeout.as_millis()),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS evaluation failed")?;
        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let _ = self.page.close().await;
        Ok(())
    }
}
