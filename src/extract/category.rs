//! Category revenue extraction from the results overlay.
//!
//! Flow: locate the overlay tab, best-effort expand the result set, wait
//! out the re-render, then read the aggregate revenue through the locator
//! chain. Expansion failure is non-fatal, since some result sets arrive
//! fully loaded; a missing overlay or missing aggregate is an error.

use std::time::Duration;

use crate::browser::{evaluate_with_timeout, script, BrowserSession, PageDriver};
use crate::error::{Result, ScribeError};
use crate::extract::locator::MetricLocator;
use crate::extract::{selectors, settle};
use crate::model::Metric;

/// Tuning for the overlay scan and expansion.
#[derive(Debug, Clone)]
pub struct CategoryConfig {
    /// Text marker identifying the overlay widget on a page.
    pub overlay_marker: String,
    /// Host fragment a candidate tab's URL must contain.
    pub host_fragment: String,
    /// Label of the results-expansion control.
    pub expand_label: String,
    /// Per-tab probe timeout while scanning for the overlay.
    pub probe_timeout: Duration,
    /// Settle delay after a successful expansion.
    pub expand_settle: Duration,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        CategoryConfig {
            overlay_marker: "Xray".to_string(),
            host_fragment: "amazon.".to_string(),
            expand_label: "Load More".to_string(),
            probe_timeout: Duration::from_millis(1500),
            expand_settle: settle::AFTER_EXPAND,
        }
    }
}

/// Aggregate figures read off the overlay.
#[derive(Debug, Clone)]
pub struct CategoryReading {
    pub total_revenue: Metric,
    /// Parent-level monthly revenue for the searched product, when the
    /// overlay exposes it.
    pub parent_revenue: Option<Metric>,
}

pub struct CategoryRevenueExtractor<'a> {
    session: &'a dyn BrowserSession,
    cfg: CategoryConfig,
}

impl<'a> CategoryRevenueExtractor<'a> {
    pub fn new(session: &'a dyn BrowserSession) -> Self {
        CategoryRevenueExtractor {
            session,
            cfg: CategoryConfig::default(),
        }
    }

    pub fn with_config(session: &'a dyn BrowserSession, cfg: CategoryConfig) -> Self {
        CategoryRevenueExtractor { session, cfg }
    }

    /// Run the full overlay flow.
    pub async fn extract(&self) -> Result<CategoryReading> {
        let page = self.locate_overlay().await?;
        page.bring_to_front()
            .await
            .map_err(|e| ScribeError::Browser(e.to_string()))?;
        tokio::time::sleep(settle::AFTER_FOCUS).await;

        if self.expand_results(page.as_ref()).await {
            tracing::info!(
                settle_s = self.cfg.expand_settle.as_secs(),
                "results expansion triggered, waiting for overlay re-render"
            );
            tokio::time::sleep(self.cfg.expand_settle).await;
        } else {
            tracing::warn!("could not trigger results expansion, reading as-is");
        }

        self.read_aggregate(page.as_ref()).await
    }

    /// Scan open tabs for one on the target marketplace with the overlay
    /// widget visible.
    async fn locate_overlay(&self) -> Result<Box<dyn PageDriver>> {
        let pages = self
            .session
            .pages()
            .await
            .map_err(|e| ScribeError::Browser(e.to_string()))?;
        for page in pages {
            let url = page.url().await.unwrap_or_default();
            if !url.contains(&self.cfg.host_fragment) {
                continue;
            }
            let probe = script::body_contains(&self.cfg.overlay_marker);
            match evaluate_with_timeout(page.as_ref(), &probe, self.cfg.probe_timeout).await {
                Ok(Some(v)) if v.as_bool() == Some(true) => {
                    tracing::debug!(%url, "overlay tab located");
                    return Ok(page);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(%url, error = %e, "overlay probe failed");
                }
            }
        }
        Err(ScribeError::OverlayNotReady(format!(
            "overlay marker {:?} not visible on any {}* tab",
            self.cfg.overlay_marker, self.cfg.host_fragment
        )))
    }

    /// Try the expansion control through three click paths. Returns
    /// whether any of them reported a hit.
    async fn expand_results(&self, page: &dyn PageDriver) -> bool {
        let pattern = format!("^\\\\s*{}\\\\s*$", script::label_regex_source(&self.cfg.expand_label));
        let attempts = [
            ("native-click", script::click_by_text("button", &pattern)),
            (
                "generic-click",
                script::click_by_text("button,div,span,a", &pattern),
            ),
            (
                "dispatch-click",
                script::dispatch_click_by_text("button,div,span,a", &pattern),
            ),
        ];
        for (path, js) in attempts {
            match evaluate_with_timeout(page, &js, Duration::from_secs(4)).await {
                Ok(Some(v)) if v.as_bool() == Some(true) => {
                    tracing::debug!(path, "expansion control clicked");
                    return true;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(path, error = %e, "expansion click errored");
                }
            }
        }
        false
    }

    /// Read the aggregate revenue (and the parent-level figure when
    /// present) through the locator chain.
    async fn read_aggregate(&self, page: &dyn PageDriver) -> Result<CategoryReading> {
        let locator = MetricLocator::standard(Some(selectors::OVERLAY_REVENUE_VALUE));
        let text = locator.locate(page, "Total Revenue").await?;
        let total_revenue = Metric::count(text);

        let parent_revenue = match MetricLocator::standard(None)
            .locate(page, "Parent Level Revenue")
            .await
        {
            Ok(text) => Some(Metric::count(text)),
            Err(ScribeError::ValueNotFound { .. }) => {
                tracing::debug!("parent-level revenue not exposed on this overlay");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(CategoryReading {
            total_revenue,
            parent_revenue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::testing::{FakePage, FakeSession};
    use serde_json::json;

    fn overlay_page() -> FakePage {
        FakePage::new("https://www.amazon.co.uk/s?k=football")
            .respond("includes('Xray')", json!(true))
            .respond("sc-iYRSqv", json!("4,768,718"))
            .respond("Parent\\\\s+Level\\\\s+Revenue", json!("$231,767.51"))
    }

    fn fast_cfg() -> CategoryConfig {
        CategoryConfig {
            expand_settle: Duration::from_millis(1),
            probe_timeout: Duration::from_millis(200),
            ..CategoryConfig::default()
        }
    }

    #[tokio::test]
    async fn reads_aggregate_from_overlay_tab() {
        let session = FakeSession::new(vec![
            FakePage::new("https://other.example/"),
            overlay_page(),
        ]);
        let extractor = CategoryRevenueExtractor::with_config(&session, fast_cfg());
        let reading = extractor.extract().await.unwrap();
        assert_eq!(reading.total_revenue.text, "4,768,718");
        assert_eq!(reading.total_revenue.number, Some(4_768_718.0));
        let parent = reading.parent_revenue.unwrap();
        assert_eq!(parent.number, Some(231_768.0));
    }

    #[tokio::test]
    async fn missing_overlay_is_overlay_not_ready() {
        let session = FakeSession::new(vec![FakePage::new("https://www.amazon.com/dp/B1")]);
        let extractor = CategoryRevenueExtractor::with_config(&session, fast_cfg());
        let err = extractor.extract().await.unwrap_err();
        assert!(matches!(err, ScribeError::OverlayNotReady(_)));
    }

    #[tokio::test]
    async fn expansion_failure_is_non_fatal() {
        // no load-more response at all -> still reads the aggregate
        let session = FakeSession::new(vec![overlay_page()]);
        let extractor = CategoryRevenueExtractor::with_config(&session, fast_cfg());
        let reading = extractor.extract().await.unwrap();
        assert_eq!(reading.total_revenue.number, Some(4_768_718.0));
    }

    #[tokio::test]
    async fn missing_aggregate_surfaces_value_not_found() {
        let page = FakePage::new("https://www.amazon.com/s?k=x")
            .respond("includes('Xray')", json!(true));
        let session = FakeSession::new(vec![page]);
        let extractor = CategoryRevenueExtractor::with_config(&session, fast_cfg());
        let err = extractor.extract().await.unwrap_err();
        assert!(matches!(err, ScribeError::ValueNotFound { .. }));
    }
}
