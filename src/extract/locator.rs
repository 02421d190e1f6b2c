//! Label-to-value location over an unstable DOM.
//!
//! Strategies run in order, each inside its own timeout and error
//! boundary; the first non-empty text wins. Exhaustion is a hard
//! `ValueNotFound`; callers must not substitute zero for a value the
//! overlay never showed.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::browser::{evaluate_with_timeout, script, PageDriver};
use crate::error::{Result, ScribeError};

/// A located text qualifies only when it reads as a value: at most a short
/// symbol/code prefix, then digits with separators and an optional
/// magnitude suffix. Screens out strategies that anchored on the label
/// itself or on surrounding prose.
fn value_shaped(text: &str) -> bool {
    static SHAPE: OnceLock<regex::Regex> = OnceLock::new();
    let re = SHAPE.get_or_init(|| {
        regex::Regex::new(r"(?i)^\D{0,6}\d[\d\s.,']*\s*[KMB]?$").expect("value shape regex")
    });
    re.is_match(text.trim())
}

/// One way of finding the value associated with a label.
#[async_trait]
pub trait LocateStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn timeout(&self) -> Duration;

    /// `Ok(None)` is a miss; errors are contained by the chain.
    async fn locate(&self, page: &dyn PageDriver, label: &str) -> anyhow::Result<Option<String>>;
}

/// A known, previously-stable CSS path. Fastest, least durable.
pub struct ExactSelector {
    pub selector: String,
    pub timeout: Duration,
}

#[async_trait]
impl LocateStrategy for ExactSelector {
    fn name(&self) -> &'static str {
        "exact-selector"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn locate(&self, page: &dyn PageDriver, _label: &str) -> anyhow::Result<Option<String>> {
        let js = script::inner_text(&self.selector, 0);
        let value = evaluate_with_timeout(page, &js, self.timeout).await?;
        Ok(value.and_then(|v| v.as_str().map(str::to_string)))
    }
}

/// Geometric search for the closest currency-shaped text below-and-near
/// the label's bounding box.
pub struct BelowNear {
    pub max_gap_px: u32,
    pub center_tol_px: u32,
    pub timeout: Duration,
}

impl Default for BelowNear {
    fn default() -> Self {
        BelowNear {
            max_gap_px: 200,
            center_tol_px: 180,
            timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl LocateStrategy for BelowNear {
    fn name(&self) -> &'static str {
        "below-near"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn locate(&self, page: &dyn PageDriver, label: &str) -> anyhow::Result<Option<String>> {
        let js = script::below_near_value(label, self.max_gap_px, self.center_tol_px);
        let value = evaluate_with_timeout(page, &js, self.timeout).await?;
        Ok(value.and_then(|v| v.as_str().map(str::to_string)))
    }
}

/// Bounded ancestor tree-walk returning the first bare-numeric descendant.
pub struct AncestorWalk {
    pub depth: u32,
    pub timeout: Duration,
}

impl Default for AncestorWalk {
    fn default() -> Self {
        AncestorWalk {
            depth: 5,
            timeout: Duration::from_secs(3),
        }
    }
}

#[async_trait]
impl LocateStrategy for AncestorWalk {
    fn name(&self) -> &'static str {
        "ancestor-walk"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn locate(&self, page: &dyn PageDriver, label: &str) -> anyhow::Result<Option<String>> {
        let js = script::ancestor_walk_value(label, self.depth);
        let value = evaluate_with_timeout(page, &js, self.timeout).await?;
        Ok(value.and_then(|v| v.as_str().map(str::to_string)))
    }
}

/// An ordered chain of location strategies.
pub struct MetricLocator {
    strategies: Vec<Box<dyn LocateStrategy>>,
}

impl MetricLocator {
    pub fn with_strategies(strategies: Vec<Box<dyn LocateStrategy>>) -> Self {
        MetricLocator { strategies }
    }

    /// The standard chain: optional exact selector, geometry search,
    /// ancestor walk.
    pub fn standard(exact_selector: Option<&str>) -> Self {
        let mut strategies: Vec<Box<dyn LocateStrategy>> = Vec::new();
        if let Some(selector) = exact_selector {
            strategies.push(Box::new(ExactSelector {
                selector: selector.to_string(),
                timeout: Duration::from_secs(3),
            }));
        }
        strategies.push(Box::new(BelowNear::default()));
        strategies.push(Box::new(AncestorWalk::default()));
        MetricLocator { strategies }
    }

    /// Run the chain. First non-empty text wins; per-strategy errors and
    /// timeouts are logged and the chain moves on.
    pub async fn locate(&self, page: &dyn PageDriver, label: &str) -> Result<String> {
        for strategy in &self.strategies {
            match strategy.locate(page, label).await {
                Ok(Some(text)) if value_shaped(&text) => {
                    tracing::debug!(label, strategy = strategy.name(), "value located");
                    return Ok(collapse_whitespace(&text));
                }
                Ok(_) => {
                    tracing::debug!(label, strategy = strategy.name(), "strategy missed");
                }
                Err(e) => {
                    tracing::debug!(label, strategy = strategy.name(), error = %e, "strategy errored");
                }
            }
        }
        Err(ScribeError::ValueNotFound {
            label: label.to_string(),
            strategies: self.strategies.len(),
        })
    }
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::testing::FakePage;
    use serde_json::json;

    #[tokio::test]
    async fn exact_selector_wins_when_it_matches() {
        let page = FakePage::new("https://www.amazon.com/x")
            .respond("div.known", json!("$1,234.56"))
            .respond("Math.hypot", json!("$9.99"));
        let locator = MetricLocator::standard(Some("div.known"));
        let text = locator.locate(&page, "Total Revenue").await.unwrap();
        assert_eq!(text, "$1,234.56");
    }

    #[tokio::test]
    async fn falls_back_to_geometry_then_walk() {
        // exact selector returns null -> geometry answers
        let page = FakePage::new("x").respond("Math.hypot", json!("4,768,718"));
        let locator = MetricLocator::standard(Some("div.gone"));
        let text = locator.locate(&page, "Total Revenue").await.unwrap();
        assert_eq!(text, "4,768,718");

        // geometry also misses -> ancestor walk answers
        let page = FakePage::new("x").respond("createTreeWalker", json!("  123.45 "));
        let locator = MetricLocator::standard(None);
        let text = locator.locate(&page, "FBA Fees").await.unwrap();
        assert_eq!(text, "123.45");
    }

    #[test]
    fn value_shape_screens_out_prose() {
        assert!(value_shaped("$231,767.51"));
        assert!(value_shaped("AED 1,2M"));
        assert!(value_shaped("4,768,718"));
        assert!(!value_shaped("Total Revenue"));
        assert!(!value_shaped("Revenue for the last 30 days was strong"));
        assert!(!value_shaped(""));
    }

    #[tokio::test]
    async fn label_echo_from_a_strategy_is_rejected() {
        let page = FakePage::new("x")
            .respond("div.known", json!("Total Revenue"))
            .respond("Math.hypot", json!("1,234"));
        let locator = MetricLocator::standard(Some("div.known"));
        let text = locator.locate(&page, "Total Revenue").await.unwrap();
        assert_eq!(text, "1,234");
    }

    #[tokio::test]
    async fn exhaustion_is_value_not_found() {
        let page = FakePage::new("x");
        let locator = MetricLocator::standard(Some("div.gone"));
        let err = locator.locate(&page, "Total Revenue").await.unwrap_err();
        match err {
            ScribeError::ValueNotFound { label, strategies } => {
                assert_eq!(label, "Total Revenue");
                assert_eq!(strategies, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_text_counts_as_miss() {
        let page = FakePage::new("x")
            .respond("div.known", json!("   "))
            .respond("Math.hypot", json!("42"));
        let locator = MetricLocator::standard(Some("div.known"));
        let text = locator.locate(&page, "Total Revenue").await.unwrap();
        assert_eq!(text, "42");
    }

    #[tokio::test]
    async fn slow_strategy_times_out_and_chain_continues() {
        let mut page = FakePage::new("x").respond("createTreeWalker", json!("77"));
        page.delay = Some(Duration::from_millis(50));
        let locator = MetricLocator::with_strategies(vec![
            Box::new(ExactSelector {
                selector: "div.slow".into(),
                timeout: Duration::from_millis(1),
            }),
            Box::new(AncestorWalk {
                depth: 5,
                timeout: Duration::from_secs(2),
            }),
        ]);
        let text = locator.locate(&page, "Total Revenue").await.unwrap();
        assert_eq!(text, "77");
    }
}
