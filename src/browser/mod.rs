//! Browser session abstraction.
//!
//! Defines the `BrowserSession` and `PageDriver` traits that abstract over
//! the automation backend (currently Chrome via chromiumoxide, connected
//! over CDP). Extractors only ever see these traits; tests drive them with
//! scripted fakes.

pub mod cdp;
pub mod script;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// A single open page (tab) in the shared automation session.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Stable identifier of the underlying target, used to keep a page
    /// alive while closing its siblings.
    fn id(&self) -> String;

    /// Current page URL.
    async fn url(&self) -> Result<String>;

    /// Raise the page to the foreground. The overlay renders only into
    /// the active tab.
    async fn bring_to_front(&self) -> Result<()>;

    /// Navigate with a timeout.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Close this page.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// The shared automation session. One per process; extraction against it
/// is strictly sequential because the overlay keeps per-tab UI state.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// All currently open pages.
    async fn pages(&self) -> Result<Vec<Box<dyn PageDriver>>>;

    /// Open a new page at the given URL.
    async fn open_page(&self, url: &str) -> Result<Box<dyn PageDriver>>;

    /// Close every page except the one with the given id (or every page
    /// when `keep` is `None`). Returns how many pages were closed.
    async fn close_pages_except(&self, keep: Option<&str>) -> Result<usize>;
}

/// Evaluate a script with a timeout, mapping elapsed timeouts to `None`.
///
/// Strategy probes treat a slow page the same as a miss; the caller moves
/// on to the next strategy instead of blocking the whole chain.
pub async fn evaluate_with_timeout(
    page: &dyn PageDriver,
    script: &str,
    timeout: Duration,
) -> Result<Option<serde_json::Value>> {
    match tokio::time::timeout(timeout, page.evaluate(script)).await {
        Ok(Ok(v)) => Ok(Some(v)),
        Ok(Err(e)) => Err(e),
        Err(_) => Ok(None),
    }
}
